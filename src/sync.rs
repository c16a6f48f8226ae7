//! Asset sync from the remote data repository
//!
//! Data files come first, since the image plan is derived from the
//! downloaded records. Every download is retried up to [`MAX_ATTEMPTS`] times
//! and images are decoded and re-encoded as PNG before they are kept.

use crate::assets::{AssetKind, AssetPaths};
use crate::error::{Error, Result};
use crate::items::{Furniture, Item};
use crate::localize::Language;
use crate::record::{self, EntityRecord};
use crate::sandbox;
use crate::stats::StatKey;
use rayon::prelude::*;
use reqwest::blocking;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DATA_REPO: &str = "https://github.com/lonqie/SchaleDB";
pub const MAX_ATTEMPTS: u32 = 5;

const DATA_FILES: [&str; 5] = ["students", "localization", "equipment", "items", "furniture"];

const EQUIPMENT_CATEGORIES: [&str; 9] = [
    "Badge", "Bag", "Charm", "Gloves", "Hairpin", "Hat", "Necklace", "Shoes", "Watch",
];

const UI_ICONS: [(&str, &str); 10] = [
    ("Adapt_0", "Ingame_Emo_AdaptresultD"),
    ("Adapt_1", "Ingame_Emo_AdaptresultC"),
    ("Adapt_2", "Ingame_Emo_AdaptresultB"),
    ("Adapt_3", "Ingame_Emo_AdaptresultA"),
    ("Adapt_4", "Ingame_Emo_AdaptresultS"),
    ("Adapt_5", "Ingame_Emo_AdaptresultSS"),
    ("Street", "Terrain_Street"),
    ("Outdoor", "Terrain_Outdoor"),
    ("Indoor", "Terrain_Indoor"),
    ("Cover", "Combat_Icon_Cover_Ally"),
];

const OTHER_ICONS: [(&str, &str); 1] = [("Credits", "currency_icon_gold")];

/// Source of remote bytes
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTPS client; plain http is only accepted for localhost
pub struct ReqwestFetch {
    client: blocking::Client,
}

impl ReqwestFetch {
    pub fn new() -> Result<Self> {
        let client = blocking::Client::builder()
            .user_agent(concat!("momotalk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Fetch for ReqwestFetch {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let is_local = url.starts_with("http://localhost") || url.starts_with("http://127.0.0.1");
        if url.starts_with("http://") && !is_local {
            return Err(Error::Network(format!("refusing plain http for {}", url)));
        }

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Network(format!("{}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("HTTP error {} while loading {}", status, url)));
        }
        let body = response
            .bytes()
            .map_err(|e| Error::Network(format!("failed to read body from {}: {}", url, e)))?;
        Ok(body.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub languages: Vec<Language>,
    /// Re-download files that already exist
    pub force: bool,
    pub threads: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            languages: vec![Language::Cn],
            force: false,
            threads: 8,
        }
    }
}

/// One file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    pub target: PathBuf,
    /// Decode and store as PNG
    pub image: bool,
    /// Overwrite an existing target
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: usize,
    pub skipped: usize,
    /// URLs that failed every attempt
    pub failed: Vec<String>,
}

impl SyncReport {
    fn record(&mut self, url: &str, result: Result<Outcome>) {
        match result {
            Ok(Outcome::Downloaded) => self.downloaded += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(e) => {
                log::warn!("Giving up on {}: {}", url, e);
                self.failed.push(url.to_string());
            }
        }
    }
}

pub fn raw_url(path: &str) -> String {
    format!("{}/raw/main/{}", DATA_REPO, path)
}

/// Data files for every requested language. The catalog always needs cn and
/// the item tables key off jp, so both are included.
pub fn plan_data(paths: &AssetPaths, languages: &[Language]) -> Vec<Download> {
    let mut langs = vec![Language::Cn, Language::Jp];
    for lang in languages {
        if !langs.contains(lang) {
            langs.push(*lang);
        }
    }
    langs
        .into_iter()
        .flat_map(|lang| {
            DATA_FILES.iter().map(move |file| Download {
                url: raw_url(&format!("data/{}/{}.json", lang.code(), file)),
                target: paths.data_file(lang, file),
                image: false,
                force: true,
            })
        })
        .collect()
}

/// Every icon the renderers look up, derived from the downloaded records
pub fn plan_images(
    paths: &AssetPaths,
    records: &[EntityRecord],
    items: &[Item],
    furniture: &[Furniture],
    force: bool,
) -> Vec<Download> {
    let mut plan = ImagePlan {
        paths,
        force,
        seen: HashSet::new(),
        downloads: Vec::new(),
    };

    for r in records {
        plan.add(&format!("images/student/icon/{}.webp", r.id), AssetKind::Icon, &r.path_name);
        plan.add(&format!("images/student/portrait/{}.webp", r.id), AssetKind::Portrait, &r.dev_name);
        if !r.school.is_empty() {
            plan.add(
                &format!("images/schoolicon/School_Icon_{}_W.png", r.school.to_uppercase()),
                AssetKind::School,
                &r.school,
            );
        }
        if !r.weapon_img.is_empty() {
            plan.add(&format!("images/weapon/{}.webp", r.weapon_img), AssetKind::Weapon, &r.weapon_img);
        }
        if r.gear.as_ref().is_some_and(|g| !g.name.is_empty()) {
            let id = r.id.to_string();
            plan.add(&format!("images/gear/icon/{}.webp", id), AssetKind::Gear, &id);
        }
        for skill in r.skills.iter().filter(|s| !s.icon.is_empty()) {
            plan.add(&format!("images/skill/{}.webp", skill.icon), AssetKind::Skill, &skill.icon);
        }
    }
    for category in EQUIPMENT_CATEGORIES {
        plan.add(
            &format!("images/equipment/icon/equipment_icon_{}_tier8.webp", category.to_lowercase()),
            AssetKind::Equipment,
            category,
        );
    }
    for key in StatKey::CARD {
        plan.add(&format!("images/staticon/Stat_{}.png", key.name()), AssetKind::Stat, key.name());
    }
    for item in items.iter().filter(|i| !i.icon.is_empty()) {
        plan.add(&format!("images/item/icon/{}.webp", item.icon), AssetKind::Item, &item.id.to_string());
    }
    for f in furniture.iter().filter(|f| !f.icon.is_empty()) {
        plan.add(&format!("images/furniture/icon/{}.webp", f.icon), AssetKind::Furniture, &f.id.to_string());
    }
    for (name, icon) in UI_ICONS {
        plan.add(&format!("images/ui/{}.png", icon), AssetKind::Ui, name);
    }
    for (name, icon) in OTHER_ICONS {
        plan.add(&format!("images/item/icon/{}.webp", icon), AssetKind::Other, name);
    }
    plan.downloads
}

struct ImagePlan<'a> {
    paths: &'a AssetPaths,
    force: bool,
    seen: HashSet<PathBuf>,
    downloads: Vec<Download>,
}

impl ImagePlan<'_> {
    fn add(&mut self, remote: &str, kind: AssetKind, name: &str) {
        let target = match self.paths.asset_path(kind, name) {
            Ok(t) => t,
            Err(e) => {
                log::debug!("Skipping {} asset {:?}: {}", kind.dir_name(), name, e);
                return;
            }
        };
        if self.seen.insert(target.clone()) {
            self.downloads.push(Download {
                url: raw_url(remote),
                target,
                image: true,
                force: self.force,
            });
        }
    }
}

/// Fetches one file, retrying transient failures. Images that do not decode
/// are never written.
pub fn download_with_retry(fetch: &dyn Fetch, download: &Download) -> Result<Outcome> {
    if !download.force && download.target.exists() {
        return Ok(Outcome::Skipped);
    }
    if let Some(parent) = download.target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut last = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match fetch_once(fetch, download) {
            Ok(()) => {
                log::debug!("Downloaded {}", download.url);
                return Ok(Outcome::Downloaded);
            }
            Err(e) => {
                log::debug!("Attempt {}/{} for {} failed: {}", attempt, MAX_ATTEMPTS, download.url, e);
                last = Some(e);
            }
        }
    }
    Err(last.unwrap_or_else(|| Error::Network(format!("no attempts made for {}", download.url))))
}

fn fetch_once(fetch: &dyn Fetch, download: &Download) -> Result<()> {
    let body = fetch.get(&download.url)?;
    sandbox::check_download_size(body.len()).map_err(|e| Error::Network(e.to_string()))?;
    if download.image {
        let img = image::load_from_memory(&body)?;
        if let Err(e) = img.save_with_format(&download.target, image::ImageFormat::Png) {
            let _ = std::fs::remove_file(&download.target);
            return Err(e.into());
        }
    } else {
        std::fs::write(&download.target, &body)?;
    }
    Ok(())
}

fn run(pool: &rayon::ThreadPool, fetch: &dyn Fetch, downloads: &[Download], report: &mut SyncReport) {
    let results: Vec<Result<Outcome>> =
        pool.install(|| downloads.par_iter().map(|d| download_with_retry(fetch, d)).collect());
    for (download, result) in downloads.iter().zip(results) {
        report.record(&download.url, result);
    }
}

fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let body = std::fs::read_to_string(path)?;
    record::as_array(serde_json::from_str::<serde_json::Value>(&body)?)
}

/// Downloads data files for `options.languages`, then every image they
/// reference. Individual failures are collected in the report.
pub fn sync(paths: &AssetPaths, fetch: &dyn Fetch, options: &SyncOptions) -> Result<SyncReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.max(1))
        .build()
        .map_err(|e| Error::Config(format!("cannot build sync pool: {}", e)))?;
    let mut report = SyncReport::default();

    let data = plan_data(paths, &options.languages);
    log::info!("Syncing {} data files", data.len());
    run(&pool, fetch, &data, &mut report);

    let records: Vec<EntityRecord> = load_table(&paths.data_file(Language::Cn, "students"))?;
    let items: Vec<Item> = load_table(&paths.data_file(Language::Cn, "items")).unwrap_or_else(|e| {
        log::warn!("No item table: {}", e);
        Vec::new()
    });
    let furniture: Vec<Furniture> = load_table(&paths.data_file(Language::Cn, "furniture")).unwrap_or_else(|e| {
        log::warn!("No furniture table: {}", e);
        Vec::new()
    });

    let images = plan_images(paths, &records, &items, &furniture, options.force);
    log::info!("Syncing {} images for {} characters", images.len(), records.len());
    run(&pool, fetch, &images, &mut report);

    log::info!(
        "Sync finished: {} downloaded, {} skipped, {} failed",
        report.downloaded,
        report.skipped,
        report.failed.len()
    );
    Ok(report)
}
