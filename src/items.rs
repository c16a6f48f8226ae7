//! Gift items, furniture and equipment tables

use crate::assets::AssetPaths;
use crate::localize::Language;
use crate::record;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;

/// Lowest tier tried when looking up equipment
const MIN_EQUIPMENT_TIER: u32 = 7;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Item {
    pub id: u32,
    pub category: String,
    pub rarity: String,
    pub tags: Vec<String>,
    pub icon: String,
    pub name: String,
    pub desc: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Furniture {
    pub id: u32,
    pub rarity: String,
    pub category: String,
    pub icon: String,
    pub name: String,
    pub desc: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Equipment {
    pub id: u32,
    pub category: String,
    pub tier: u32,
    pub icon: String,
    pub name: String,
}

/// Reference rows (jp) decide membership; display rows (cn) are shown
struct Tables<T> {
    reference: Vec<T>,
    display: Vec<T>,
}

impl<T> Default for Tables<T> {
    fn default() -> Self {
        Self {
            reference: Vec::new(),
            display: Vec::new(),
        }
    }
}

pub struct ItemCatalog {
    paths: Option<AssetPaths>,
    items: OnceLock<Tables<Item>>,
    furniture: OnceLock<Tables<Furniture>>,
    equipment: OnceLock<Vec<Equipment>>,
}

impl ItemCatalog {
    pub fn new(paths: AssetPaths) -> Self {
        Self {
            paths: Some(paths),
            items: OnceLock::new(),
            furniture: OnceLock::new(),
            equipment: OnceLock::new(),
        }
    }

    pub fn from_parts(items: Vec<Item>, furniture: Vec<Furniture>, equipment: Vec<Equipment>) -> Self {
        let catalog = Self {
            paths: None,
            items: OnceLock::new(),
            furniture: OnceLock::new(),
            equipment: OnceLock::new(),
        };
        let _ = catalog.items.set(Tables {
            reference: items,
            display: Vec::new(),
        });
        let _ = catalog.furniture.set(Tables {
            reference: furniture,
            display: Vec::new(),
        });
        let _ = catalog.equipment.set(equipment);
        catalog
    }

    fn load<T: DeserializeOwned>(&self, lang: Language, file: &str) -> Vec<T> {
        let Some(paths) = &self.paths else {
            return Vec::new();
        };
        let path = paths.data_file(lang, file);
        let parsed = std::fs::read_to_string(&path)
            .map_err(crate::error::Error::from)
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).map_err(Into::into))
            .and_then(record::as_array::<T>);
        match parsed {
            Ok(rows) => rows,
            Err(e) => {
                log::debug!("Cannot read {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    fn tables<'a, T: DeserializeOwned>(&self, cell: &'a OnceLock<Tables<T>>, file: &str) -> &'a Tables<T> {
        cell.get_or_init(|| Tables {
            reference: self.load(Language::Jp, file),
            display: self.load(Language::Cn, file),
        })
    }

    /// Gift items whose tags intersect `tags`, in table order
    pub fn favors_by_tags(&self, tags: &[String]) -> Vec<Item> {
        let tables = self.tables(&self.items, "items");
        tables
            .reference
            .iter()
            .filter(|i| i.category == "Favor" && i.tags.iter().any(|t| tags.contains(t)))
            .map(|i| {
                tables
                    .display
                    .iter()
                    .find(|d| d.id == i.id)
                    .unwrap_or(i)
                    .clone()
            })
            .collect()
    }

    pub fn item(&self, id: u32) -> Option<Item> {
        let tables = self.tables(&self.items, "items");
        tables
            .display
            .iter()
            .chain(&tables.reference)
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn furniture(&self, id: u32) -> Option<Furniture> {
        let tables = self.tables(&self.furniture, "furniture");
        tables
            .display
            .iter()
            .chain(&tables.reference)
            .find(|f| f.id == id)
            .cloned()
    }

    /// Equipment of `category` at `tier`, stepping down to tier 7
    pub fn equipment(&self, category: &str, tier: u32) -> Option<Equipment> {
        let rows = self
            .equipment
            .get_or_init(|| self.load(Language::Jp, "equipment"));
        (MIN_EQUIPMENT_TIER..=tier.max(MIN_EQUIPMENT_TIER))
            .rev()
            .find_map(|t| rows.iter().find(|e| e.category == category && e.tier == t))
            .cloned()
    }
}
