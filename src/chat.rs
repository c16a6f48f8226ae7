//! Chat screenshot renderer
//!
//! Lays out a title bar, then every message block top to bottom, then an
//! optional watermark. Each block measures its text first, records
//! backgrounds and foregrounds in one `place` call per row, and advances the
//! cursor past the row.

use crate::assets::AssetKind;
use crate::catalog::EntityRef;
use crate::record::EntityRecord;
use crate::color::Color;
use crate::compositor::{Compositor, Primitive, RenderedImage};
use crate::config::{ChatConfig, IconSource};
use crate::error::{Error, Result};
use crate::raster::{self, Shape};
use crate::resources::Resources;
use crate::sandbox;
use crate::script::{self, MessageBlock, Segment};
use crate::text::{Align, Face, TextRequest};
use rayon::prelude::*;
use resvg::tiny_skia::Pixmap;
use std::path::Path;
use std::sync::Arc;

pub const CANVAS_WIDTH: u32 = 720;
pub const BACKGROUND: Color = Color::rgb(0xec, 0xf2, 0xfb);
/// Cursor offset of the title bar
pub const TOP_MARGIN: u32 = 8;
pub const TITLE_HEIGHT: u32 = 84;
/// Smallest vertical slot any block occupies
pub const MIN_ROW_HEIGHT: u32 = 72;
pub const BLOCK_GAP: u32 = 12;

const TEXT_DARK: Color = Color::rgb(0x4b, 0x5a, 0x6f);
const COUNTERPART: Color = Color::rgb(0x4a, 0x8a, 0xc6);
const BUBBLE_TEXT: Color = Color::rgb(0xec, 0xf2, 0xfb);
const BORDER: Color = Color::rgb(0xcd, 0xd3, 0xdc);
const GREY: Color = Color::rgb(0x87, 0x92, 0x9e);
const CHOICE_FILL: Color = Color::rgb(0xe2, 0xee, 0xf3);
const CHOICE_ACCENT: Color = Color::rgb(0x31, 0x98, 0xde);
const OPTION_FILL: Color = Color::rgb(0xfe, 0xfe, 0xfe);
const BANNER_FILL: Color = Color::rgb(0xff, 0xec, 0xf2);
const BANNER_ACCENT: Color = Color::rgb(0xff, 0x8b, 0xa0);
const BANNER_TEXT: Color = Color::rgb(0xff, 0xed, 0xf1);

const BODY_SIZE: f32 = 32.0;
const BUBBLE_WIDTH: u32 = CANVAS_WIDTH - 140;
const IMAGE_MAX: u32 = 300;
const AVATAR: u32 = 64;
const CARD_LEFT: i32 = 96;
const CARD_WIDTH: u32 = CANVAS_WIDTH - 116;

const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 512 477.9" fill="#fff"><path d="M101.8 396.4c-53.3 0-98.4 53.8-101.8 79.5 81.4 7.9 196.1-6.8 252.1-65-74.7 13.5-135.9-5.2-150.3-14.5zM281.4 412.5c55.1 73.3 137.7 58.5 230.5 63.3 3.5-42.1-73.2-80.9-103.9-82.2-39.9 28.5-123.3 19.5-126.6 18.9z"/><path d="M256.4 0C136.8 45 31.5 151.4 31.5 259.4c0 85 68.4 153.9 195.3 137.3 3.9-.5 7.6-1.1 11.2-1.7-1.1-.4-2.1-.9-2.9-1.3-19.4-9.8-53.4-56.7-39-112.6 1.4 59.3 39.7 102.6 57.1 111 2.7 1.3 11.9 4.6 25.5 6.7 51.9 8 164.9 4.7 187.9-116.7C498.9 111.4 256.4 0 256.4 0z"/></svg>"##;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn bubble_color(self) -> Color {
        match self {
            Side::Left => TEXT_DARK,
            Side::Right => COUNTERPART,
        }
    }
}

/// Renders parsed scripts into chat screenshots
pub struct ChatRenderer {
    config: ChatConfig,
    resources: Resources,
    candidates: Vec<Arc<EntityRecord>>,
}

impl ChatRenderer {
    pub fn new(resources: Resources) -> Self {
        Self::with_config(resources, ChatConfig::default())
    }

    pub fn with_config(resources: Resources, config: ChatConfig) -> Self {
        Self { config, resources, candidates: Vec::new() }
    }

    /// The records the script was parsed against; speakers drawn from them
    /// keep their own avatar even when the catalog has a record with the same id
    pub fn with_candidates(mut self, candidates: &[Arc<EntityRecord>]) -> Self {
        self.candidates = candidates.to_vec();
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Renders `blocks`; `[img:n]` tokens index into `images` from 1
    pub fn render(
        &self,
        blocks: &[MessageBlock],
        images: &[Vec<u8>],
        watermark: Option<&str>,
    ) -> Result<RenderedImage> {
        let images = self.prepare_images(images)?;
        let mut layout = ChatLayout {
            flow: Compositor::new(CANVAS_WIDTH, TOP_MARGIN),
            resources: &self.resources,
            config: &self.config,
            candidates: &self.candidates,
            images: &images,
        };

        layout.title_bar()?;
        for block in blocks {
            match block {
                MessageBlock::Speaker { entity, lines } => layout.speaker(entity, lines)?,
                MessageBlock::Counterpart { lines } => layout.counterpart(lines)?,
                MessageBlock::ChoiceList { options } => layout.choices(options)?,
                MessageBlock::RelationshipBanner { entity, caption } => layout.banner(entity, caption)?,
            }
            layout.flow.advance(BLOCK_GAP);
        }
        if let Some(mark) = watermark.map(str::trim).filter(|m| !m.is_empty()) {
            layout.watermark(mark)?;
        }

        log::debug!("Rendered {} blocks, {} inline images", blocks.len(), images.len());
        layout.flow.finish(BACKGROUND, 0)
    }

    /// Decodes, fits, rounds and frames every inline image, keeping order
    fn prepare_images(&self, images: &[Vec<u8>]) -> Result<Vec<Arc<Pixmap>>> {
        self.resources.assets.install(|| {
            images
                .par_iter()
                .map(|bytes| -> Result<Arc<Pixmap>> {
                    sandbox::check_image_size(bytes.len()).map_err(|e| Error::Image(e.to_string()))?;
                    let mut img = raster::decode_fit(bytes, IMAGE_MAX)?;
                    raster::round_corners(&mut img, 12.0)?;
                    let frame = Shape::rounded(img.width(), img.height(), 12.0, BORDER)
                        .without_fill()
                        .with_stroke(BORDER, 2.0)
                        .rasterize()?;
                    raster::overlay(&mut img, &frame, 0, 0);
                    Ok(Arc::new(img))
                })
                .collect()
        })
    }
}

struct ChatLayout<'a> {
    flow: Compositor,
    resources: &'a Resources,
    config: &'a ChatConfig,
    candidates: &'a [Arc<EntityRecord>],
    images: &'a [Arc<Pixmap>],
}

impl ChatLayout<'_> {
    fn text(&self, request: TextRequest) -> Result<Arc<Pixmap>> {
        Ok(Arc::new(self.resources.text.render(&request)?))
    }

    fn title_bar(&mut self) -> Result<()> {
        let top = self.flow.cursor();
        let icon = match &self.config.title_icon {
            IconSource::BuiltIn => raster::render_svg(LOGO, 36, 36)?,
            IconSource::Svg(markup) => raster::render_svg(markup, 36, 36)?,
            IconSource::Image(bytes) => raster::decode_fit(bytes, 36)?,
        };
        let title = self.text(
            TextRequest::new(self.config.title.as_str(), 36.0, Color::WHITE)
                .max_width(CANVAS_WIDTH - 132)
                .face(Face::Heading),
        )?;
        let close = self.text(TextRequest::new("X", 40.0, Color::WHITE))?;

        self.flow.place([
            Primitive::shape(
                Shape::rounded(CANVAS_WIDTH - 12, 64, 18.0, self.config.title_background),
                6,
                top,
            ),
            Primitive::pixels(icon, 24, top + 12),
            Primitive::pixels(title, 72, top + 16),
            Primitive::pixels(close, CANVAS_WIDTH as i32 - 52, top + 16),
        ])?;
        self.flow.advance(TITLE_HEIGHT);
        Ok(())
    }

    fn avatar(&self, entity: &EntityRef) -> Result<Option<Pixmap>> {
        let Some(record) = self.resources.catalog.resolve_among(entity, self.candidates) else {
            log::debug!("No record for {:?}, drawing without avatar", entity.name);
            return Ok(None);
        };
        let assets = &self.resources.assets;
        let icon = match &record.icon {
            Some(path) => assets.load_file(Path::new(path)),
            None if !record.path_name.is_empty() => assets.get(AssetKind::Icon, &record.path_name),
            None => None,
        };
        let Some(icon) = icon else {
            return Ok(None);
        };
        let mut avatar = raster::resize(&icon, AVATAR, AVATAR)?;
        raster::clip_circle(&mut avatar)?;
        Ok(Some(avatar))
    }

    fn speaker(&mut self, entity: &EntityRef, lines: &[String]) -> Result<()> {
        let start = self.flow.cursor();
        let name = self.text(TextRequest::new(entity.name.as_str(), 24.0, TEXT_DARK).max_width(BUBBLE_WIDTH))?;
        let name_height = name.height();

        let mut row = Vec::with_capacity(2);
        if let Some(avatar) = self.avatar(entity)? {
            row.push(Primitive::pixels(avatar, 12, start));
        }
        row.push(Primitive::pixels(name, CARD_LEFT, start));
        self.flow.place(row)?;
        self.flow.advance(name_height + 4);

        self.bubbles(lines, Side::Left)?;
        self.flow.advance(8);
        self.flow.pad_row(start, MIN_ROW_HEIGHT);
        Ok(())
    }

    fn counterpart(&mut self, lines: &[String]) -> Result<()> {
        let start = self.flow.cursor();
        self.bubbles(lines, Side::Right)?;
        self.flow.advance(8);
        self.flow.pad_row(start, MIN_ROW_HEIGHT);
        Ok(())
    }

    /// Text bubbles and framed images; only a leading text bubble gets a tail
    fn bubbles(&mut self, lines: &[String], side: Side) -> Result<()> {
        let width = CANVAS_WIDTH as i32;
        let lines = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());
        for (n, line) in lines.enumerate() {
            for (i, segment) in script::segments(line, self.images.len()).into_iter().enumerate() {
                let top = self.flow.cursor();
                match segment {
                    Segment::Text(text) => {
                        let text = self.text(
                            TextRequest::new(text, BODY_SIZE, BUBBLE_TEXT).max_width(BUBBLE_WIDTH),
                        )?;
                        let (w, h) = (text.width(), text.height());
                        let (bubble_left, text_left) = match side {
                            Side::Left => (CARD_LEFT, CARD_LEFT + 16),
                            Side::Right => (width - w as i32 - 52, width - w as i32 - 36),
                        };

                        let mut row = Vec::with_capacity(3);
                        if n == 0 && i == 0 {
                            row.push(tail(side, top));
                        }
                        row.push(Primitive::shape(
                            Shape::rounded(w + 32, h + 32, 12.0, side.bubble_color()),
                            bubble_left,
                            top,
                        ));
                        row.push(Primitive::pixels(text, text_left, top + 16));
                        self.flow.place(row)?;
                        self.flow.advance(h + 40);
                    }
                    Segment::Image(index) => {
                        let Some(image) = self.images.get(index - 1).cloned() else {
                            continue;
                        };
                        let h = image.height();
                        let left = match side {
                            Side::Left => CARD_LEFT,
                            Side::Right => width - image.width() as i32 - 20,
                        };
                        self.flow.place([Primitive::pixels(image, left, top)])?;
                        self.flow.advance(h + 8);
                    }
                }
            }
        }
        Ok(())
    }

    /// Framed card with an accent bar and a rule under its title
    fn card_frame(&self, fill: Color, accent: Color, height: u32, title_height: u32) -> Vec<Primitive> {
        let top = self.flow.cursor();
        vec![
            Primitive::shape(
                Shape::rounded(CARD_WIDTH, height, 12.0, fill).with_stroke(BORDER, 2.0),
                CARD_LEFT,
                top,
            ),
            Primitive::shape(Shape::rect(4, 30, accent), CARD_LEFT + 16, top + 12),
            Primitive::shape(
                Shape::rect(CARD_WIDTH - 40, 2, BORDER),
                CARD_LEFT + 18,
                top + 12 + title_height + 8,
            ),
        ]
    }

    fn choices(&mut self, options: &[String]) -> Result<()> {
        let top = self.flow.cursor();
        let title = self.text(
            TextRequest::new(self.config.option_title.as_str(), BODY_SIZE, TEXT_DARK).max_width(CARD_WIDTH - 20),
        )?;
        let th = title.height();
        let rendered = options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(|o| {
                self.text(
                    TextRequest::new(o, BODY_SIZE, TEXT_DARK)
                        .max_width(CARD_WIDTH - 40)
                        .align(Align::Center),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let height = th + 26 + rendered.iter().map(|t| t.height() + 36).sum::<u32>();

        let mut row = self.card_frame(CHOICE_FILL, CHOICE_ACCENT, height + 12, th);
        row.push(Primitive::pixels(title, CARD_LEFT + 28, top + 10));
        let mut y = top + 12 + th + 20;
        for text in rendered {
            let h = text.height();
            row.push(Primitive::shape(
                Shape::rounded(CARD_WIDTH - 32, h + 24, 12.0, OPTION_FILL).with_stroke(BORDER, 2.0),
                CARD_LEFT + 18,
                y,
            ));
            row.push(Primitive::pixels(
                text.clone(),
                CARD_LEFT + (CARD_WIDTH as i32 - text.width() as i32) / 2,
                y + 12,
            ));
            y += h + 36;
        }
        self.flow.place(row)?;
        self.flow.advance(height + 24);
        self.flow.pad_row(top, MIN_ROW_HEIGHT);
        Ok(())
    }

    fn banner(&mut self, entity: &EntityRef, caption: &str) -> Result<()> {
        let top = self.flow.cursor();
        let caption = match caption.trim() {
            "" => script::default_caption(&entity.name),
            c => c.to_string(),
        };
        let title = self.text(
            TextRequest::new(self.config.kizuna_title.as_str(), BODY_SIZE, TEXT_DARK).max_width(CARD_WIDTH - 20),
        )?;
        let text = self.text(
            TextRequest::new(caption, BODY_SIZE, BANNER_TEXT)
                .max_width(CARD_WIDTH - 40)
                .align(Align::Center),
        )?;
        let (th, h) = (title.height(), text.height());
        let height = th + 26 + h + 44;

        let mut row = self.card_frame(BANNER_FILL, BANNER_ACCENT, height, th);
        row.push(Primitive::pixels(title, CARD_LEFT + 28, top + 10));
        row.push(Primitive::shape(
            Shape::rounded(CARD_WIDTH - 32, h + 24, 12.0, BANNER_ACCENT).with_stroke(BORDER, 2.0),
            CARD_LEFT + 18,
            top + 16 + th + 18,
        ));
        row.push(Primitive::pixels(
            text.clone(),
            CARD_LEFT + (CARD_WIDTH as i32 - text.width() as i32) / 2,
            top + 16 + th + 30,
        ));
        self.flow.place(row)?;
        self.flow.advance(height + 12);
        self.flow.pad_row(top, MIN_ROW_HEIGHT);
        Ok(())
    }

    fn watermark(&mut self, mark: &str) -> Result<()> {
        let top = self.flow.cursor();
        let text = self.text(
            TextRequest::new(mark, 20.0, GREY)
                .max_width(CANVAS_WIDTH - 48)
                .face(Face::Heading)
                .align(Align::Center),
        )?;
        let h = text.height();
        let left = (CANVAS_WIDTH as i32 - text.width() as i32) / 2;
        self.flow.place([Primitive::pixels(text, left, top)])?;
        self.flow.advance(h + 12);
        Ok(())
    }
}

/// Speech tail pointing at the speaker
fn tail(side: Side, top: u32) -> Primitive {
    match side {
        Side::Left => Primitive::shape(
            Shape::polygon(12, 10, &[(0.0, 5.0), (12.0, 0.0), (12.0, 10.0)], TEXT_DARK),
            84,
            top + 12,
        ),
        Side::Right => Primitive::shape(
            Shape::polygon(12, 10, &[(0.0, 0.0), (0.0, 10.0), (12.0, 5.0)], COUNTERPART),
            CANVAS_WIDTH as i32 - 20,
            top + 14,
        ),
    }
}
