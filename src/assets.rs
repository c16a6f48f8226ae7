//! Local asset cache: directory layout, decoded icons and bounded prefetch
//!
//! Assets are read-only once published. A missing or undecodable file is not
//! an error: lookups return `None` and the renderer skips that element.

use crate::error::{Error, Result};
use crate::localize::Language;
use crate::raster;
use crate::sandbox::{self, SandboxError};
use dashmap::DashMap;
use rayon::prelude::*;
use resvg::tiny_skia::Pixmap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the asset root
pub const ASSETS_ENV: &str = "MOMOTALK_ASSETS";

/// Worker count for icon prefetch
pub const DEFAULT_PREFETCH_THREADS: usize = 4;

/// Kinds of image assets, one directory each under the asset root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Icon,
    Portrait,
    School,
    Weapon,
    Gear,
    Skill,
    Equipment,
    Stat,
    Item,
    Furniture,
    Ui,
    Other,
}

impl AssetKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Icon => "icons",
            AssetKind::Portrait => "portraits",
            AssetKind::School => "schools",
            AssetKind::Weapon => "weapons",
            AssetKind::Gear => "gears",
            AssetKind::Skill => "skills",
            AssetKind::Equipment => "equipments",
            AssetKind::Stat => "stats",
            AssetKind::Item => "items",
            AssetKind::Furniture => "furnitures",
            AssetKind::Ui => "ui",
            AssetKind::Other => "others",
        }
    }
}

/// Layout of the asset root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$MOMOTALK_ASSETS`, or `./assets`
    pub fn from_env() -> Self {
        match std::env::var_os(ASSETS_ENV) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::new("assets"),
        }
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.root.join("fonts")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// `data/<lang>/<file>.json`
    pub fn data_file(&self, lang: Language, file: &str) -> PathBuf {
        self.data_dir().join(lang.code()).join(format!("{}.json", file))
    }

    pub fn asset_dir(&self, kind: AssetKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// `<kind>/<name>.png`, rejecting names that would escape the directory
    pub fn asset_path(&self, kind: AssetKind, name: &str) -> std::result::Result<PathBuf, SandboxError> {
        sandbox::validate_asset_name(name)?;
        Ok(self.asset_dir(kind).join(format!("{}.png", name)))
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::from_env()
    }
}

/// One icon to fetch during a batch prefetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub kind: AssetKind,
    pub name: String,
}

impl AssetRequest {
    pub fn new(kind: AssetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Decoded image cache shared across renders
pub struct Assets {
    paths: AssetPaths,
    cache: DashMap<PathBuf, Option<Arc<Pixmap>>>,
    pool: rayon::ThreadPool,
}

impl Assets {
    pub fn new(paths: AssetPaths) -> Result<Self> {
        Self::with_threads(paths, DEFAULT_PREFETCH_THREADS)
    }

    pub fn with_threads(paths: AssetPaths, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()
            .map_err(|e| Error::Config(format!("cannot build prefetch pool: {}", e)))?;
        Ok(Self {
            paths,
            cache: DashMap::new(),
            pool,
        })
    }

    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    /// Decoded `<kind>/<name>.png`, or `None` when absent
    pub fn get(&self, kind: AssetKind, name: &str) -> Option<Arc<Pixmap>> {
        match self.paths.asset_path(kind, name) {
            Ok(path) => self.load_file(&path),
            Err(e) => {
                log::debug!("Rejected asset name {:?}: {}", name, e);
                None
            }
        }
    }

    /// Decoded image at an arbitrary path, cached by path
    pub fn load_file(&self, path: &Path) -> Option<Arc<Pixmap>> {
        if let Some(hit) = self.cache.get(path) {
            return hit.clone();
        }
        let loaded = match decode_file(path) {
            Ok(p) => Some(Arc::new(p)),
            Err(e) => {
                log::debug!("Asset unavailable {}: {}", path.display(), e);
                None
            }
        };
        // First writer wins; published entries are never replaced
        self.cache.entry(path.to_path_buf()).or_insert(loaded).clone()
    }

    /// Fetches a batch in parallel; results come back in request order
    pub fn prefetch(&self, requests: &[AssetRequest]) -> Vec<Option<Arc<Pixmap>>> {
        self.pool.install(|| requests.par_iter().map(|r| self.get(r.kind, &r.name)).collect())
    }

    /// Runs `op` inside the bounded prefetch pool
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }
}

fn decode_file(path: &Path) -> Result<Pixmap> {
    let bytes = std::fs::read(path)?;
    let img = image::load_from_memory(&bytes)?;
    raster::from_image(&img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_png(dir: &Path, kind: AssetKind, name: &str, w: u32, h: u32) {
        let dir = dir.join(kind.dir_name());
        std::fs::create_dir_all(&dir).unwrap();
        let img = RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]));
        img.save(dir.join(format!("{}.png", name))).unwrap();
    }

    #[test]
    fn loads_and_caches_icons() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), AssetKind::Icon, "Hoshino", 8, 4);
        let assets = Assets::new(AssetPaths::new(dir.path())).unwrap();

        let icon = assets.get(AssetKind::Icon, "Hoshino").unwrap();
        assert_eq!((icon.width(), icon.height()), (8, 4));
        let again = assets.get(AssetKind::Icon, "Hoshino").unwrap();
        assert!(Arc::ptr_eq(&icon, &again));
    }

    #[test]
    fn missing_assets_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let assets = Assets::new(AssetPaths::new(dir.path())).unwrap();
        assert!(assets.get(AssetKind::Portrait, "Nobody").is_none());
        assert!(assets.get(AssetKind::Icon, "../etc/passwd").is_none());
    }

    #[test]
    fn prefetch_keeps_request_order() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            write_png(dir.path(), AssetKind::Item, name, i as u32 + 1, 1);
        }
        let assets = Assets::with_threads(AssetPaths::new(dir.path()), 3).unwrap();
        let requests: Vec<_> = ["d", "missing", "a", "c", "b"]
            .iter()
            .map(|n| AssetRequest::new(AssetKind::Item, *n))
            .collect();
        let widths: Vec<Option<u32>> = assets
            .prefetch(&requests)
            .iter()
            .map(|p| p.as_ref().map(|p| p.width()))
            .collect();
        assert_eq!(widths, vec![Some(4), None, Some(1), Some(3), Some(2)]);
    }

    #[test]
    fn data_files_are_per_language() {
        let paths = AssetPaths::new("/srv/assets");
        assert_eq!(
            paths.data_file(Language::Jp, "students"),
            PathBuf::from("/srv/assets/data/jp/students.json")
        );
    }
}
