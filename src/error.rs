//! Error types for parsing and rendering

use std::fmt;
use thiserror::Error;

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a single render call
#[derive(Error, Debug)]
pub enum Error {
    /// The script did not parse; carries every per-line message
    #[error("{0}")]
    Parse(#[from] ParseErrors),

    /// A font file could not be loaded or used
    #[error("Font error: {0}")]
    Font(String),

    /// Vector markup could not be parsed
    #[error("SVG error: {0}")]
    Svg(String),

    /// A pixel buffer could not be allocated or composited
    #[error("Raster error: {0}")]
    Raster(String),

    /// An inline image could not be decoded
    #[error("Image error: {0}")]
    Image(String),

    /// The finished canvas could not be encoded
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// A primitive was placed above the layout cursor
    #[error("Layout error: {0}")]
    Layout(String),

    /// Invalid configuration that cannot fall back to a default
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Network error during asset sync
    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<usvg::Error> for Error {
    fn from(err: usvg::Error) -> Self {
        Error::Svg(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

/// Every problem found while parsing a script, one message per entry.
///
/// Messages carry the 1-based line number they refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseErrors(pub Vec<String>);

impl ParseErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse failed with {} error(s)", self.0.len())?;
        for msg in &self.0 {
            write!(f, "\n  {}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

/// A configuration key or value that was rejected; the prior value is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    UnknownKey(String),
    BlankValue(String),
    InvalidValue { key: String, value: String, reason: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnknownKey(key) => write!(f, "Unknown config key {}", key),
            ConfigWarning::BlankValue(key) => write!(f, "Blank value for config key {}", key),
            ConfigWarning::InvalidValue { key, value, reason } => {
                write!(f, "Invalid value for config key {}: {:?} ({})", key, value, reason)
            }
        }
    }
}
