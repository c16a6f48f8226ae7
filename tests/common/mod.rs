#![allow(dead_code)]

use momotalk::items::{Equipment, Furniture, Item, ItemCatalog};
use momotalk::record::EntityRecord;
use momotalk::text::CellText;
use momotalk::{AssetKind, AssetPaths, Assets, Catalog, Localization, Resources, TextProvider, TextRequest};
use resvg::tiny_skia::Pixmap;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Text provider that records every request and draws with [`CellText`]
#[derive(Default)]
pub struct RecordingText {
    seen: Mutex<Vec<String>>,
}

impl RecordingText {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl TextProvider for RecordingText {
    fn render(&self, request: &TextRequest) -> momotalk::Result<Pixmap> {
        self.seen.lock().unwrap().push(request.plain_text());
        CellText.render(request)
    }
}

pub fn student(id: u32, name: &str) -> EntityRecord {
    EntityRecord {
        id,
        name: name.to_string(),
        path_name: name.replace([' ', '(', ')'], ""),
        ..EntityRecord::default()
    }
}

pub fn catalog() -> Catalog {
    Catalog::from_records([
        student(1, "Hoshino"),
        student(2, "Hoshino (Swimsuit)"),
        student(3, "Hoshino (Armed)"),
        student(4, "Aru"),
        student(5, "Aru (New Year)"),
        student(6, "Shiroko"),
    ])
}

/// Resources over a scratch asset root; keep the fixture alive while rendering
pub struct Fixture {
    pub dir: TempDir,
    pub text: Arc<RecordingText>,
    pub resources: Resources,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_records(catalog())
    }

    pub fn with_records(catalog: Catalog) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = AssetPaths::new(dir.path());
        let text = Arc::new(RecordingText::default());
        let resources = Resources {
            text: text.clone(),
            assets: Arc::new(Assets::with_threads(paths, 2).unwrap()),
            catalog: Arc::new(catalog),
            items: Arc::new(items()),
            localization: Arc::new(Localization::from_tables([])),
        };
        Self { dir, text, resources }
    }

    /// Writes a solid PNG where the asset cache will look for `kind/name`
    pub fn add_asset(&self, kind: AssetKind, name: &str, width: u32, height: u32) {
        self.add_filled_asset(kind, name, width, height, FILL);
    }

    pub fn add_filled_asset(&self, kind: AssetKind, name: &str, width: u32, height: u32, rgba: [u8; 4]) {
        let path = self.resources.assets.paths().asset_path(kind, name).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, filled_png(width, height, rgba)).unwrap();
    }
}

pub fn items() -> ItemCatalog {
    ItemCatalog::from_parts(
        vec![
            Item {
                id: 10,
                category: "Favor".into(),
                tags: vec!["BC".into()],
                name: "Cushion".into(),
                ..Item::default()
            },
            Item {
                id: 11,
                category: "Favor".into(),
                tags: vec!["Bc".into(), "BC".into()],
                name: "Game console".into(),
                ..Item::default()
            },
        ],
        vec![Furniture {
            id: 1001,
            name: "Sofa".into(),
            ..Furniture::default()
        }],
        vec![Equipment {
            id: 1,
            category: "Hat".into(),
            tier: 8,
            name: "Cap".into(),
            ..Equipment::default()
        }],
    )
}

/// Color of every [`png`]
pub const FILL: [u8; 4] = [40, 120, 200, 255];

pub fn png(width: u32, height: u32) -> Vec<u8> {
    filled_png(width, height, FILL)
}

pub fn filled_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn dimensions(png: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(png).unwrap();
    (img.width(), img.height())
}
