//! Chat render configuration
//!
//! Keys use the names scripts and JSON config files know them by:
//! `title`, `titleBackground`, `titleIcon`, `kizunaTitle`, `optionTitle`.
//! Rejected values are logged, returned as [`ConfigWarning`]s, and leave
//! the previous value in place.

use crate::color::Color;
use crate::error::{ConfigWarning, Error, Result};
use std::path::Path;

pub const DEFAULT_TITLE: &str = "MomoTalk";
pub const DEFAULT_TITLE_BACKGROUND: Color = Color::rgb(0xfa, 0x97, 0xab);
pub const DEFAULT_KIZUNA_TITLE: &str = "好感故事";
pub const DEFAULT_OPTION_TITLE: &str = "回复";

/// Where the title bar icon comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IconSource {
    /// The bundled logo
    #[default]
    BuiltIn,
    Svg(String),
    /// Encoded raster bytes, already known to decode
    Image(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub title: String,
    pub title_background: Color,
    pub title_icon: IconSource,
    pub kizuna_title: String,
    pub option_title: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            title_background: DEFAULT_TITLE_BACKGROUND,
            title_icon: IconSource::BuiltIn,
            kizuna_title: DEFAULT_KIZUNA_TITLE.to_string(),
            option_title: DEFAULT_OPTION_TITLE.to_string(),
        }
    }
}

impl ChatConfig {
    /// Sets one key; on rejection logs a warning and keeps the old value
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigWarning> {
        let result = self.try_set(key, value);
        if let Err(warning) = &result {
            log::warn!("{}", warning);
        }
        result
    }

    fn try_set(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigWarning> {
        let known = ["title", "titleBackground", "titleIcon", "kizunaTitle", "optionTitle"];
        if !known.contains(&key) {
            return Err(ConfigWarning::UnknownKey(key.to_string()));
        }
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigWarning::BlankValue(key.to_string()));
        }
        let invalid = |reason: String| ConfigWarning::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };

        match key {
            "title" => self.title = value.to_string(),
            "kizunaTitle" => self.kizuna_title = value.to_string(),
            "optionTitle" => self.option_title = value.to_string(),
            "titleBackground" => {
                self.title_background =
                    Color::from_hex(value).ok_or_else(|| invalid("expected a hex color".into()))?
            }
            _ => self.title_icon = load_icon(value).map_err(|e| invalid(e.to_string()))?,
        }
        Ok(())
    }

    /// Applies pairs in order, collecting every warning
    pub fn apply<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Vec<ConfigWarning>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .filter_map(|(k, v)| self.set(k.as_ref(), v.as_ref()).err())
            .collect()
    }

    /// Builds a config from a JSON object of string values
    pub fn from_json(raw: &str) -> Result<(Self, Vec<ConfigWarning>)> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let serde_json::Value::Object(map) = value else {
            return Err(Error::Config("expected a JSON object".into()));
        };
        let mut config = Self::default();
        let mut warnings = Vec::new();
        for (key, value) in map {
            match value {
                serde_json::Value::String(s) => {
                    if let Err(w) = config.set(&key, &s) {
                        warnings.push(w);
                    }
                }
                other => {
                    let w = ConfigWarning::InvalidValue {
                        key,
                        value: other.to_string(),
                        reason: "expected a string".into(),
                    };
                    log::warn!("{}", w);
                    warnings.push(w);
                }
            }
        }
        Ok((config, warnings))
    }

    pub fn load(path: &Path) -> Result<(Self, Vec<ConfigWarning>)> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// Accepts inline `<svg>` markup or a path to an SVG or raster file
fn load_icon(value: &str) -> Result<IconSource> {
    if value.starts_with("<svg") {
        usvg::Tree::from_str(value, &usvg::Options::default())?;
        return Ok(IconSource::Svg(value.to_string()));
    }
    let path = Path::new(value);
    let bytes = std::fs::read(path)?;
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        let markup = String::from_utf8(bytes).map_err(|e| Error::Svg(e.to_string()))?;
        usvg::Tree::from_str(&markup, &usvg::Options::default())?;
        Ok(IconSource::Svg(markup))
    } else {
        image::load_from_memory(&bytes)?;
        Ok(IconSource::Image(bytes))
    }
}
