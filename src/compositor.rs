//! Forward-only flow layout and final compositing
//!
//! Renderers record primitives against a vertical cursor. The cursor only
//! moves down, and nothing may be placed above it, so blocks can never
//! overlap except for layers recorded together in one [`Compositor::place`]
//! call. Painting happens once, in [`Compositor::finish`], in record order.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::raster::{self, Shape};
use resvg::tiny_skia::Pixmap;
use std::sync::Arc;

/// What a primitive paints
#[derive(Debug, Clone)]
pub enum Paint {
    Pixels(Arc<Pixmap>),
    /// Rasterized when the canvas is finalized
    Shape(Shape),
}

/// One placement: a pixel buffer or shape at an offset
#[derive(Debug, Clone)]
pub struct Primitive {
    pub paint: Paint,
    pub left: i32,
    pub top: u32,
}

impl Primitive {
    pub fn pixels(pixmap: impl Into<Arc<Pixmap>>, left: i32, top: u32) -> Self {
        Self {
            paint: Paint::Pixels(pixmap.into()),
            left,
            top,
        }
    }

    pub fn shape(shape: Shape, left: i32, top: u32) -> Self {
        Self {
            paint: Paint::Shape(shape),
            left,
            top,
        }
    }
}

/// The vertical offset where the next row starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutCursor {
    offset: u32,
}

impl LayoutCursor {
    pub fn new(offset: u32) -> Self {
        Self { offset }
    }

    /// Moves down by `height` and returns the new offset
    pub fn advance(&mut self, height: u32) -> u32 {
        self.offset = self.offset.saturating_add(height);
        self.offset
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

/// A finished, encoded canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

pub struct Compositor {
    width: u32,
    cursor: LayoutCursor,
    primitives: Vec<Primitive>,
}

impl Compositor {
    pub fn new(width: u32, start: u32) -> Self {
        Self {
            width,
            cursor: LayoutCursor::new(start),
            primitives: Vec::new(),
        }
    }

    /// Current cursor offset
    pub fn cursor(&self) -> u32 {
        self.cursor.offset()
    }

    pub fn advance(&mut self, height: u32) -> u32 {
        self.cursor.advance(height)
    }

    /// Advances so that a row starting at `start` spans at least `min` pixels
    pub fn pad_row(&mut self, start: u32, min: u32) -> u32 {
        let used = self.cursor().saturating_sub(start);
        if used < min {
            self.advance(min - used)
        } else {
            self.cursor()
        }
    }

    /// Records primitives back to front.
    ///
    /// Fails without recording anything if one of them starts above the
    /// cursor.
    pub fn place(&mut self, primitives: impl IntoIterator<Item = Primitive>) -> Result<()> {
        let batch: Vec<Primitive> = primitives.into_iter().collect();
        let cursor = self.cursor();
        if let Some(bad) = batch.iter().find(|p| p.top < cursor) {
            return Err(Error::Layout(format!(
                "primitive at top {} is above cursor {}",
                bad.top, cursor
            )));
        }
        self.primitives.extend(batch);
        Ok(())
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Paints every primitive onto a canvas as tall as the cursor
    pub fn finish(self, background: Color, min_height: u32) -> Result<RenderedImage> {
        let height = self.cursor().max(min_height).max(1);
        let mut canvas = raster::blank(self.width, height)?;
        raster::fill(&mut canvas, background);

        for primitive in &self.primitives {
            let top = i32::try_from(primitive.top)
                .map_err(|_| Error::Layout(format!("offset {} out of range", primitive.top)))?;
            match &primitive.paint {
                Paint::Pixels(pixmap) => raster::overlay(&mut canvas, pixmap, primitive.left, top),
                Paint::Shape(shape) => {
                    let pixmap = shape.rasterize()?;
                    raster::overlay(&mut canvas, &pixmap, primitive.left, top);
                }
            }
        }
        log::debug!(
            "Composited {} primitives onto {}x{}",
            self.primitives.len(),
            self.width,
            height
        );

        Ok(RenderedImage {
            width: self.width,
            height,
            png_data: raster::encode_png(&canvas)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_only_moves_forward() {
        let mut cursor = LayoutCursor::new(8);
        assert_eq!(cursor.advance(0), 8);
        assert_eq!(cursor.advance(84), 92);
        assert_eq!(cursor.offset(), 92);
    }

    #[test]
    fn rejects_primitives_above_cursor() {
        let mut c = Compositor::new(100, 10);
        let ok = Primitive::shape(Shape::rect(10, 10, Color::BLACK), 0, 10);
        c.place([ok.clone()]).unwrap();
        c.advance(20);

        let late = Primitive::shape(Shape::rect(10, 10, Color::BLACK), 0, 29);
        let err = c.place([ok, late]).unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
        assert_eq!(c.primitives().len(), 1);
    }

    #[test]
    fn pads_short_rows() {
        let mut c = Compositor::new(100, 10);
        c.advance(30);
        assert_eq!(c.pad_row(10, 72), 82);
        c.advance(100);
        assert_eq!(c.pad_row(82, 72), 182);
    }

    #[test]
    fn paints_in_record_order() {
        let mut c = Compositor::new(4, 0);
        c.place([
            Primitive::shape(Shape::rect(4, 4, Color::rgb(255, 0, 0)), 0, 0),
            Primitive::shape(Shape::rect(2, 2, Color::rgb(0, 0, 255)), 0, 0),
        ])
        .unwrap();
        c.advance(4);
        let out = c.finish(Color::WHITE, 0).unwrap();
        assert_eq!((out.width, out.height), (4, 4));

        let img = image::load_from_memory(&out.png_data).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(3, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn min_height_clamps() {
        let c = Compositor::new(10, 5);
        let out = c.finish(Color::WHITE, 40).unwrap();
        assert_eq!(out.height, 40);
    }
}
