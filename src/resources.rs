//! Shared, read-only state every renderer draws from

use crate::assets::{AssetPaths, Assets};
use crate::catalog::{Catalog, EntityCatalog};
use crate::error::Result;
use crate::items::ItemCatalog;
use crate::localize::Localization;
use crate::text::{self, TextProvider};
use std::sync::Arc;

/// Text provider, asset cache, catalogs and localization.
///
/// Cheap to clone; concurrent renders may share one bundle.
#[derive(Clone)]
pub struct Resources {
    pub text: Arc<dyn TextProvider>,
    pub assets: Arc<Assets>,
    pub catalog: Arc<dyn EntityCatalog>,
    pub items: Arc<ItemCatalog>,
    pub localization: Arc<Localization>,
}

impl Resources {
    /// Everything backed by the asset directory at `paths`
    pub fn load(paths: AssetPaths) -> Result<Self> {
        let catalog = Arc::new(Catalog::new(paths.clone()));
        Self::with_catalog(paths, catalog)
    }

    /// Like [`Resources::load`] but with a caller-owned catalog
    pub fn with_catalog(paths: AssetPaths, catalog: Arc<dyn EntityCatalog>) -> Result<Self> {
        Ok(Self {
            text: text::default_provider(&paths),
            items: Arc::new(ItemCatalog::new(paths.clone())),
            localization: Arc::new(Localization::new(paths.clone())),
            assets: Arc::new(Assets::new(paths)?),
            catalog,
        })
    }
}
