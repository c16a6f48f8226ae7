//! Localized labels: data-table lookups and built-in UI strings

use crate::assets::AssetPaths;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Data languages, in catalog search order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Cn,
    Jp,
    En,
    Tw,
    Kr,
    Th,
    Vi,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Cn,
        Language::Jp,
        Language::En,
        Language::Tw,
        Language::Kr,
        Language::Th,
        Language::Vi,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::Cn => "cn",
            Language::Jp => "jp",
            Language::En => "en",
            Language::Tw => "tw",
            Language::Kr => "kr",
            Language::Th => "th",
            Language::Vi => "vi",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown language {:?}", s))
    }
}

/// `key -> value -> text`, the shape of `localization.json`
pub type Table = HashMap<String, HashMap<String, String>>;

/// Per-language localization tables, each loaded on first use.
pub struct Localization {
    paths: Option<AssetPaths>,
    tables: [OnceLock<Option<Table>>; 7],
}

impl Localization {
    pub fn new(paths: AssetPaths) -> Self {
        Self {
            paths: Some(paths),
            tables: Default::default(),
        }
    }

    /// In-memory tables only; languages not listed have no table
    pub fn from_tables(tables: impl IntoIterator<Item = (Language, Table)>) -> Self {
        let loc = Self {
            paths: None,
            tables: Default::default(),
        };
        for (lang, table) in tables {
            let _ = loc.tables[lang.index()].set(Some(table));
        }
        loc
    }

    fn table(&self, lang: Language) -> Option<&Table> {
        self.tables[lang.index()]
            .get_or_init(|| {
                let paths = self.paths.as_ref()?;
                let file = paths.data_file(lang, "localization");
                let raw = match std::fs::read_to_string(&file) {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::debug!("No localization at {}: {}", file.display(), e);
                        return None;
                    }
                };
                match serde_json::from_str::<serde_json::Value>(&raw) {
                    Ok(value) => Some(string_tables(value)),
                    Err(e) => {
                        log::warn!("Malformed localization {}: {}", file.display(), e);
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Looks `value` up under `key`; falls back to `value` itself.
    ///
    /// The `i18n` key routes to the built-in UI strings.
    pub fn localize(&self, key: &str, value: &str, lang: Language) -> String {
        if key == "i18n" {
            return i18n(value, lang);
        }
        let Some(table) = self.table(lang) else {
            log::warn!("Cannot load localization file for {}", lang);
            return value.to_string();
        };
        let Some(entries) = table.get(key) else {
            log::warn!("Cannot find {:?} in {}", key, lang);
            return value.to_string();
        };
        match entries.get(value) {
            Some(text) if !text.is_empty() => text.clone(),
            _ => {
                log::warn!("Cannot get {:?} from {:?} in {}", value, key, lang);
                value.to_string()
            }
        }
    }
}

// Keeps string leaves only; some tables carry nested or numeric entries
fn string_tables(value: serde_json::Value) -> Table {
    let serde_json::Value::Object(keys) = value else {
        return Table::new();
    };
    keys.into_iter()
        .filter_map(|(key, entries)| match entries {
            serde_json::Value::Object(entries) => Some((
                key,
                entries
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        serde_json::Value::String(s) => Some((k, s)),
                        _ => None,
                    })
                    .collect(),
            )),
            _ => None,
        })
        .collect()
}

static MESSAGES: OnceLock<Table> = OnceLock::new();

fn messages() -> &'static Table {
    MESSAGES.get_or_init(|| {
        serde_json::from_str(include_str!("i18n.json")).unwrap_or_else(|e| {
            log::warn!("Built-in UI strings are malformed: {}", e);
            Table::new()
        })
    })
}

/// Built-in UI string for `text`, falling back to Japanese, then to `text`
pub fn i18n(text: &str, lang: Language) -> String {
    let table = messages();
    if let Some(hit) = table.get(lang.code()).and_then(|m| m.get(text)) {
        return hit.clone();
    }
    if lang != Language::Jp {
        if let Some(hit) = table.get(Language::Jp.code()).and_then(|m| m.get(text)) {
            return hit.clone();
        }
    }
    text.to_string()
}
