//! Text metrics and glyph rasterization
//!
//! Renderers never talk to a font library directly. They hand a
//! [`TextRequest`] to a [`TextProvider`] and get back a tightly sized pixmap
//! whose width and height are the measured text box. Wrapping is per
//! character: a line breaks before the first glyph that would overflow
//! `max_width`, and `\n` always starts a new line.

use crate::assets::AssetPaths;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::raster;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle, WrapStyle};
use fontdue::{Font, FontSettings};
use resvg::tiny_skia::Pixmap;
use std::path::Path;
use std::sync::Arc;

/// Width used when a request does not set one
pub const DEFAULT_MAX_WIDTH: u32 = 720;

/// A run of text drawn in one color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub color: Color,
}

impl Span {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// Which typeface a request is drawn in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Face {
    /// Rounded face for message bodies and labels
    #[default]
    Body,
    /// Bold face for titles and the watermark
    Heading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub spans: Vec<Span>,
    pub size: f32,
    pub max_width: u32,
    pub align: Align,
    pub face: Face,
}

impl TextRequest {
    pub fn new(text: impl Into<String>, size: f32, color: Color) -> Self {
        Self::rich(vec![Span::new(text, color)], size)
    }

    pub fn rich(spans: Vec<Span>, size: f32) -> Self {
        Self {
            spans,
            size,
            max_width: DEFAULT_MAX_WIDTH,
            align: Align::Left,
            face: Face::Body,
        }
    }

    pub fn max_width(mut self, width: u32) -> Self {
        self.max_width = width.max(1);
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn face(mut self, face: Face) -> Self {
        self.face = face;
        self
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Measures and rasterizes text.
///
/// The returned pixmap is exactly the measured text box: its width is the
/// widest wrapped line and its height covers every line. Empty text yields a
/// 1x1 transparent pixmap.
pub trait TextProvider: Send + Sync {
    fn render(&self, request: &TextRequest) -> Result<Pixmap>;
}

/// Loads the bundled fonts, falling back to [`CellText`] when none is present
pub fn default_provider(paths: &AssetPaths) -> Arc<dyn TextProvider> {
    match FontdueText::from_dir(&paths.fonts_dir()) {
        Ok(text) => Arc::new(text),
        Err(e) => {
            log::warn!("Falling back to cell glyphs: {}", e);
            Arc::new(CellText)
        }
    }
}

/// fontdue-backed text provider
pub struct FontdueText {
    body: Font,
    heading: Option<Font>,
}

impl FontdueText {
    pub fn from_bytes(body: &[u8], heading: Option<&[u8]>) -> Result<Self> {
        let body = Font::from_bytes(body, FontSettings::default()).map_err(|e| Error::Font(e.to_string()))?;
        let heading = match heading {
            Some(bytes) => Some(Font::from_bytes(bytes, FontSettings::default()).map_err(|e| Error::Font(e.to_string()))?),
            None => None,
        };
        Ok(Self { body, heading })
    }

    /// Reads `body.ttf` (required) and `heading.ttf` (optional); `.otf` also accepted
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let body = read_font(dir, "body")?
            .ok_or_else(|| Error::Font(format!("no body font in {}", dir.display())))?;
        let heading = read_font(dir, "heading")?;
        Self::from_bytes(&body, heading.as_deref())
    }

    fn font(&self, face: Face) -> &Font {
        match face {
            Face::Heading => self.heading.as_ref().unwrap_or(&self.body),
            Face::Body => &self.body,
        }
    }
}

fn read_font(dir: &Path, stem: &str) -> Result<Option<Vec<u8>>> {
    for ext in ["ttf", "otf"] {
        let path = dir.join(format!("{}.{}", stem, ext));
        if path.is_file() {
            return Ok(Some(std::fs::read(path)?));
        }
    }
    Ok(None)
}

impl TextProvider for FontdueText {
    fn render(&self, request: &TextRequest) -> Result<Pixmap> {
        let fonts = [self.font(request.face)];
        let mut layout: Layout<Color> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            max_width: Some(request.max_width as f32),
            wrap_style: WrapStyle::Letter,
            ..LayoutSettings::default()
        });
        for span in &request.spans {
            if span.text.is_empty() {
                continue;
            }
            layout.append(&fonts, &TextStyle::with_user_data(&span.text, request.size, 0, span.color));
        }

        let glyphs = layout.glyphs();
        let width = glyphs
            .iter()
            .map(|g| g.x + g.width as f32)
            .fold(0.0f32, f32::max)
            .ceil() as u32;
        let height = layout.height().ceil() as u32;
        if width == 0 || height == 0 {
            return raster::blank(1, 1);
        }

        // Per-glyph horizontal shift, non-zero only for centered lines
        let mut shift = vec![0i32; glyphs.len()];
        if request.align == Align::Center {
            if let Some(lines) = layout.lines() {
                for line in lines {
                    let end = line.glyph_end.min(glyphs.len().saturating_sub(1));
                    let Some(range) = glyphs.get(line.glyph_start..=end) else {
                        continue;
                    };
                    let right = range.iter().map(|g| g.x + g.width as f32).fold(0.0f32, f32::max);
                    let dx = ((width as f32 - right) / 2.0).floor().max(0.0) as i32;
                    for s in shift.iter_mut().take(end + 1).skip(line.glyph_start) {
                        *s = dx;
                    }
                }
            }
        }

        let font = fonts[0];
        let mut pixmap = raster::blank(width, height)?;
        for (glyph, dx) in glyphs.iter().zip(shift) {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, bitmap) = font.rasterize_config(glyph.key);
            let gx = glyph.x.round() as i32 + dx;
            let gy = glyph.y.round() as i32;
            for (i, alpha) in bitmap.iter().enumerate() {
                let px = gx + (i % metrics.width) as i32;
                let py = gy + (i / metrics.width) as i32;
                raster::blend_pixel(&mut pixmap, px, py, glyph.user_data, *alpha);
            }
        }
        Ok(pixmap)
    }
}

/// Font-free provider that draws each glyph as a solid cell.
///
/// Metrics are a pure function of the text: ASCII characters advance by
/// `0.55 * size`, everything else by `size`, and lines are `1.3 * size`
/// tall. Used when no font file is available and by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellText;

impl CellText {
    fn advance(c: char, size: f32) -> u32 {
        if c.is_ascii() {
            (size * 0.55).ceil() as u32
        } else {
            size.ceil() as u32
        }
    }

    fn line_height(size: f32) -> u32 {
        (size * 1.3).ceil() as u32
    }
}

struct Cell {
    c: char,
    color: Color,
    x: u32,
    advance: u32,
}

impl TextProvider for CellText {
    fn render(&self, request: &TextRequest) -> Result<Pixmap> {
        let mut lines: Vec<Vec<Cell>> = vec![vec![]];
        let mut line_w = 0u32;
        for span in &request.spans {
            for c in span.text.chars() {
                if c == '\n' {
                    lines.push(vec![]);
                    line_w = 0;
                    continue;
                }
                let advance = Self::advance(c, request.size);
                let has_cells = lines.last().is_some_and(|l| !l.is_empty());
                if has_cells && line_w + advance > request.max_width {
                    lines.push(vec![]);
                    line_w = 0;
                }
                if let Some(line) = lines.last_mut() {
                    line.push(Cell {
                        c,
                        color: span.color,
                        x: line_w,
                        advance,
                    });
                }
                line_w += advance;
            }
        }

        let widths: Vec<u32> = lines
            .iter()
            .map(|l| l.last().map(|c| c.x + c.advance).unwrap_or(0))
            .collect();
        let width = widths.iter().copied().max().unwrap_or(0);
        if width == 0 {
            return raster::blank(1, 1);
        }
        let line_h = Self::line_height(request.size);
        let mut pixmap = raster::blank(width, line_h * lines.len() as u32)?;

        for (row, (line, line_w)) in lines.iter().zip(&widths).enumerate() {
            let dx = match request.align {
                Align::Left => 0,
                Align::Center => (width - line_w) / 2,
            };
            let top = row as u32 * line_h + line_h / 5;
            let bottom = row as u32 * line_h + line_h * 9 / 10;
            for cell in line.iter().filter(|c| !c.c.is_whitespace()) {
                let left = dx + cell.x + 1;
                let right = dx + cell.x + cell.advance.saturating_sub(1);
                for y in top..bottom {
                    for x in left..right {
                        raster::blend_pixel(&mut pixmap, x as i32, y as i32, cell.color, 255);
                    }
                }
            }
        }
        Ok(pixmap)
    }
}
