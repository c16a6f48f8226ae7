//! MomoTalk: chat-style dialogue screenshots and character cards
//!
//! A script of short command lines is parsed into [`MessageBlock`]s, laid out
//! top to bottom on a fixed-width canvas by [`ChatRenderer`], and encoded as a
//! PNG. [`CardRenderer`] draws a single character's profile card from the
//! same catalog and asset directory.
//!
//! ```no_run
//! use momotalk::{parse, AssetPaths, ChatRenderer, Resources};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resources = Resources::load(AssetPaths::from_env())?;
//! let blocks = parse("/S Hoshino hello\n/O hi", &[], resources.catalog.as_ref())?;
//! let image = ChatRenderer::new(resources).render(&blocks, &[], None)?;
//! std::fs::write("chat.png", image.png_data)?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod card;
pub mod catalog;
pub mod chat;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod items;
pub mod localize;
pub mod raster;
pub mod record;
pub mod resources;
pub mod rich_text;
pub mod sandbox;
pub mod script;
pub mod stats;
pub mod sync;
pub mod text;

pub use assets::{AssetKind, AssetPaths, Assets};
pub use card::{CardOptions, CardRenderer};
pub use catalog::{Catalog, EntityCatalog, EntityRef};
pub use chat::ChatRenderer;
pub use color::Color;
pub use compositor::{Compositor, RenderedImage};
pub use config::ChatConfig;
pub use error::{ConfigWarning, Error, ParseErrors, Result};
pub use localize::{Language, Localization};
pub use record::EntityRecord;
pub use resources::Resources;
pub use script::{parse, MessageBlock};
pub use text::{TextProvider, TextRequest};
