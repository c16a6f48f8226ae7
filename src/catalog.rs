//! Entity catalog: name search and id lookup across language tables

use crate::assets::AssetPaths;
use crate::localize::Language;
use crate::record::{self, EntityRecord};
use std::sync::{Arc, OnceLock, RwLock};

/// A non-owning reference to an entity, resolved at render time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub id: u32,
    pub name: String,
    pub language: Language,
}

impl EntityRef {
    pub fn of(record: &EntityRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            language: record.language.unwrap_or_default(),
        }
    }
}

/// Lookup surface used by the parser and renderers
pub trait EntityCatalog: Send + Sync {
    /// Records whose names match `query`, with `extra` searched first
    fn find_by_name(&self, query: &str, extra: &[Arc<EntityRecord>]) -> Vec<Arc<EntityRecord>>;

    fn find_by_id(&self, id: u32, lang: Language) -> Option<Arc<EntityRecord>>;

    /// Resolves a reference produced by the parser.
    ///
    /// An id hit only counts when its name agrees, so a reused id never
    /// resolves to another character.
    fn resolve(&self, entity: &EntityRef) -> Option<Arc<EntityRecord>> {
        let by_id = |lang| self.find_by_id(entity.id, lang);
        by_id(entity.language)
            .filter(|r| r.name == entity.name)
            .or_else(|| by_id(Language::Cn).filter(|r| r.name == entity.name))
            .or_else(|| {
                self.find_by_name(&entity.name, &[])
                    .into_iter()
                    .find(|r| r.name == entity.name)
            })
    }

    /// Like [`EntityCatalog::resolve`], but checks the records the script was
    /// parsed against before the catalog
    fn resolve_among(&self, entity: &EntityRef, candidates: &[Arc<EntityRecord>]) -> Option<Arc<EntityRecord>> {
        candidates
            .iter()
            .find(|c| c.id == entity.id && c.name == entity.name)
            .cloned()
            .or_else(|| self.resolve(entity))
    }
}

/// Case-folds a name and maps full-width parentheses to ASCII
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '（' => '(',
            '）' => ')',
            c => c,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

const THEMED_PREFIX: char = '水';
const THEMED_SUFFIX: &str = "(泳装)";

/// `水X` names the swimsuit variant of `X`.
///
/// Applied only when the literal query finds nothing.
pub fn themed_variant(query: &str) -> Option<String> {
    let rest = query.trim().strip_prefix(THEMED_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    Some(format!("{}{}", rest, THEMED_SUFFIX))
}

/// Default catalog backed by `data/<lang>/students.json`
pub struct Catalog {
    paths: Option<AssetPaths>,
    languages: [OnceLock<Vec<Arc<EntityRecord>>>; 7],
    extras: RwLock<Vec<Arc<EntityRecord>>>,
}

impl Catalog {
    pub fn new(paths: AssetPaths) -> Self {
        Self {
            paths: Some(paths),
            languages: Default::default(),
            extras: RwLock::new(Vec::new()),
        }
    }

    /// Fixed in-memory catalog; records without a language count as `cn`
    pub fn from_records(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        let mut grouped: [Vec<Arc<EntityRecord>>; 7] = Default::default();
        for mut r in records {
            let lang = *r.language.get_or_insert(Language::Cn);
            grouped[lang.index()].push(Arc::new(r));
        }
        let catalog = Self {
            paths: None,
            languages: Default::default(),
            extras: RwLock::new(Vec::new()),
        };
        for (slot, records) in catalog.languages.iter().zip(grouped) {
            let _ = slot.set(records);
        }
        catalog
    }

    /// Every record of one language, loading the table on first use
    pub fn records(&self, lang: Language) -> &[Arc<EntityRecord>] {
        self.languages[lang.index()].get_or_init(|| self.load(lang))
    }

    fn load(&self, lang: Language) -> Vec<Arc<EntityRecord>> {
        let Some(paths) = &self.paths else {
            return Vec::new();
        };
        let file = paths.data_file(lang, "students");
        let raw = match std::fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("No student table at {}: {}", file.display(), e);
                return Vec::new();
            }
        };
        let parsed = serde_json::from_str::<serde_json::Value>(&raw)
            .map_err(crate::error::Error::from)
            .and_then(record::as_array::<EntityRecord>);
        match parsed {
            Ok(records) => {
                log::debug!("Loaded {} students for {}", records.len(), lang);
                records
                    .into_iter()
                    .map(|mut r| {
                        r.language = Some(lang);
                        Arc::new(r)
                    })
                    .collect()
            }
            Err(e) => {
                log::warn!("Malformed student table {}: {}", file.display(), e);
                Vec::new()
            }
        }
    }

    /// Adds entities searched before every language table.
    ///
    /// A record with the same id and name as one already registered is ignored.
    pub fn register(&self, records: impl IntoIterator<Item = EntityRecord>) {
        let mut extras = match self.extras.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for r in records {
            if extras.iter().any(|e| e.id == r.id && e.name == r.name) {
                continue;
            }
            extras.push(Arc::new(r));
        }
    }

    fn extras(&self) -> Vec<Arc<EntityRecord>> {
        match self.extras.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn search(&self, query: &str, extra: &[Arc<EntityRecord>]) -> Vec<Arc<EntityRecord>> {
        let needle = normalize_name(query);
        let extras = self.extras();
        // Only table rows are swapped for their cn copy
        let registered = [extra, extras.as_slice()].into_iter().map(|g| (g, false));
        let tables = Language::ALL.into_iter().map(|l| (self.records(l), true));

        let mut found = Vec::new();
        for (group, from_table) in registered.chain(tables) {
            for r in group {
                let hit = || if from_table { self.primary(r) } else { r.clone() };
                if r.exact_names().any(|n| normalize_name(n) == needle) {
                    return vec![hit()];
                }
                if r.search_names().any(|n| normalize_name(n).contains(&needle)) {
                    found.push(hit());
                }
            }
        }
        found
    }

    /// The cn copy of a table row, which carries the canonical name
    fn primary(&self, record: &Arc<EntityRecord>) -> Arc<EntityRecord> {
        if record.language == Some(Language::Cn) {
            return record.clone();
        }
        self.find_by_id(record.id, Language::Cn)
            .unwrap_or_else(|| record.clone())
    }
}

impl EntityCatalog for Catalog {
    fn find_by_name(&self, query: &str, extra: &[Arc<EntityRecord>]) -> Vec<Arc<EntityRecord>> {
        let mut found = self.search(query, extra);
        if found.is_empty() {
            if let Some(alt) = themed_variant(query) {
                found = self.search(&alt, extra);
            }
        }

        let mut unique: Vec<Arc<EntityRecord>> = Vec::new();
        for f in found {
            if unique
                .iter()
                .any(|u| (u.id != 0 && u.id == f.id) || u.name == f.name)
            {
                continue;
            }
            unique.push(f);
        }
        unique
    }

    fn find_by_id(&self, id: u32, lang: Language) -> Option<Arc<EntityRecord>> {
        self.records(lang).iter().find(|r| r.id == id).cloned()
    }
}
