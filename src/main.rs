//! MomoTalk command line
//!
//! Usage: momotalk <chat|card|find|sync> ...

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use momotalk::card::{CardOptions, CardRenderer};
use momotalk::sync::{self, ReqwestFetch, SyncOptions};
use momotalk::{AssetPaths, ChatConfig, ChatRenderer, EntityRecord, Language, Resources};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "momotalk", version, about = "Chat screenshots and character cards from a tiny script")]
struct Cli {
    /// Asset root; defaults to $MOMOTALK_ASSETS or ./assets
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a chat script
    Chat {
        script: PathBuf,
        /// Inline image, referenced from the script as [img:n] in the order given
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        #[arg(long)]
        watermark: Option<String>,
        /// JSON object of title settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSON list of extra characters, searched before the catalog
        #[arg(long)]
        students: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Render a character card
    Card {
        /// Numeric id or name
        entity: String,
        #[arg(long, default_value = "cn")]
        lang: Language,
        #[arg(long)]
        watermark: Option<String>,
        #[arg(long, default_value_t = 90)]
        level: u32,
        #[arg(long, default_value_t = 5)]
        star: u8,
        #[arg(long, default_value_t = 20)]
        bond: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List characters matching a name
    Find { name: String },
    /// Download data files and icons into the asset root
    Sync {
        #[arg(long = "lang")]
        languages: Vec<Language>,
        #[arg(long)]
        force: bool,
        #[arg(long, default_value_t = 8)]
        threads: usize,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let paths = cli.assets.map(AssetPaths::new).unwrap_or_else(AssetPaths::from_env);

    match cli.command {
        Command::Chat { script, images, watermark, config, students, output } => {
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let images = images
                .iter()
                .map(|p| std::fs::read(p).with_context(|| format!("Failed to read image {}", p.display())))
                .collect::<Result<Vec<_>>>()?;
            let config = match config {
                Some(path) => ChatConfig::load(&path)?.0,
                None => ChatConfig::default(),
            };

            let candidates = match students {
                Some(path) => load_students(&path)?,
                None => Vec::new(),
            };

            let resources = Resources::load(paths)?;
            let blocks = momotalk::parse(&source, &candidates, resources.catalog.as_ref())?;
            let image = ChatRenderer::with_config(resources, config)
                .with_candidates(&candidates)
                .render(&blocks, &images, watermark.as_deref())?;
            std::fs::write(&output, &image.png_data)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!("Wrote {}x{} chat to {}", image.width, image.height, output.display());
        }
        Command::Card { entity, lang, watermark, level, star, bond, output } => {
            let resources = Resources::load(paths)?;
            let record = lookup(&resources, &entity)?;
            let options = CardOptions { level, star_grade: star, bond_level: bond };
            let image = CardRenderer::with_options(resources, options).render(&record, lang, watermark.as_deref())?;
            std::fs::write(&output, &image.png_data)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!("Wrote {}x{} card to {}", image.width, image.height, output.display());
        }
        Command::Find { name } => {
            let resources = Resources::load(paths)?;
            for record in resources.catalog.find_by_name(&name, &[]) {
                println!("{}\t{}\t{}", record.id, record.name, record.school);
            }
        }
        Command::Sync { languages, force, threads } => {
            let mut options = SyncOptions { force, threads, ..SyncOptions::default() };
            if !languages.is_empty() {
                options.languages = languages;
            }
            let fetch = ReqwestFetch::new()?;
            let report = sync::sync(&paths, &fetch, &options)?;
            if !report.failed.is_empty() {
                bail!("{} downloads failed", report.failed.len());
            }
        }
    }
    Ok(())
}

fn load_students(path: &Path) -> Result<Vec<Arc<EntityRecord>>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw).with_context(|| format!("Malformed {}", path.display()))?;
    let records = momotalk::record::as_array::<EntityRecord>(value)?;
    Ok(records.into_iter().map(Arc::new).collect())
}

fn lookup(resources: &Resources, query: &str) -> Result<Arc<EntityRecord>> {
    if let Ok(id) = query.parse::<u32>() {
        return resources
            .catalog
            .find_by_id(id, Language::Cn)
            .with_context(|| format!("No character with id {}", id));
    }
    let mut found = resources.catalog.find_by_name(query, &[]);
    match found.len() {
        0 => bail!("No character matches {:?}", query),
        1 => Ok(found.remove(0)),
        _ => {
            let names: Vec<&str> = found.iter().map(|r| r.name.as_str()).collect();
            bail!("{:?} may refer to {}", query, names.join(", "))
        }
    }
}
