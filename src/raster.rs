//! Pixel buffers and vector shapes
//!
//! Every visual element ends up as a premultiplied RGBA [`Pixmap`]. Shapes are
//! described as plain rectangles, rounded rectangles, ellipses and polygons,
//! serialized to SVG and rasterized through usvg/resvg.

use crate::color::Color;
use crate::error::{Error, Result};
use image::DynamicImage;
use resvg::tiny_skia::{
    BlendMode, FilterQuality, IntSize, Pixmap, PixmapPaint, PremultipliedColorU8, Transform,
};
use std::fmt::Write as _;

/// Outline of a vector shape, in its own `width x height` box
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Rect,
    Rounded(f32),
    Ellipse,
    /// Points in box coordinates
    Polygon(Vec<(f32, f32)>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

/// A vector shape that is rasterized when the canvas is finalized
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
    pub outline: Outline,
    pub fill: Option<Color>,
    pub stroke: Option<Stroke>,
}

impl Shape {
    pub fn rect(width: u32, height: u32, fill: Color) -> Self {
        Self {
            width,
            height,
            outline: Outline::Rect,
            fill: Some(fill),
            stroke: None,
        }
    }

    pub fn rounded(width: u32, height: u32, radius: f32, fill: Color) -> Self {
        Self {
            width,
            height,
            outline: Outline::Rounded(radius),
            fill: Some(fill),
            stroke: None,
        }
    }

    pub fn polygon(width: u32, height: u32, points: &[(f32, f32)], fill: Color) -> Self {
        Self {
            width,
            height,
            outline: Outline::Polygon(points.to_vec()),
            fill: Some(fill),
            stroke: None,
        }
    }

    pub fn with_stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke = Some(Stroke { color, width });
        self
    }

    pub fn without_fill(mut self) -> Self {
        self.fill = None;
        self
    }

    /// SVG document for this shape; strokes are inset so they stay inside the box
    pub fn to_svg(&self) -> String {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        let inset = self.stroke.map(|s| s.width / 2.0).unwrap_or(0.0);

        let mut paint = String::new();
        match self.fill {
            Some(c) => {
                let _ = write!(paint, r#" fill="{}" fill-opacity="{}""#, c.to_hex(), c.opacity());
            }
            None => paint.push_str(r#" fill="none""#),
        }
        if let Some(s) = self.stroke {
            let _ = write!(
                paint,
                r#" stroke="{}" stroke-opacity="{}" stroke-width="{}""#,
                s.color.to_hex(),
                s.color.opacity(),
                s.width
            );
        }

        let body = match &self.outline {
            Outline::Rect => format!(
                r#"<rect x="{inset}" y="{inset}" width="{}" height="{}"{paint}/>"#,
                w - inset * 2.0,
                h - inset * 2.0
            ),
            Outline::Rounded(r) => {
                let r = r.min((w - inset * 2.0) / 2.0).min((h - inset * 2.0) / 2.0).max(0.0);
                format!(
                    r#"<rect x="{inset}" y="{inset}" width="{}" height="{}" rx="{r}" ry="{r}"{paint}/>"#,
                    w - inset * 2.0,
                    h - inset * 2.0
                )
            }
            Outline::Ellipse => format!(
                r#"<ellipse cx="{}" cy="{}" rx="{}" ry="{}"{paint}/>"#,
                w / 2.0,
                h / 2.0,
                w / 2.0 - inset,
                h / 2.0 - inset
            ),
            Outline::Polygon(points) => {
                let pts: Vec<String> = points.iter().map(|(x, y)| format!("{},{}", x, y)).collect();
                format!(r#"<polygon points="{}"{paint}/>"#, pts.join(" "))
            }
        };

        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#
        )
    }

    pub fn rasterize(&self) -> Result<Pixmap> {
        render_svg(&self.to_svg(), self.width, self.height)
    }
}

/// Allocates a transparent pixmap, failing on a zero-sized request
pub fn blank(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| Error::Raster(format!("cannot allocate {}x{} pixmap", width, height)))
}

/// Rasterizes SVG markup scaled to fit inside `width x height`
pub fn render_svg(markup: &str, width: u32, height: u32) -> Result<Pixmap> {
    let tree = usvg::Tree::from_str(markup, &usvg::Options::default())?;
    let size = tree.size();
    let sx = width as f32 / size.width().max(f32::EPSILON);
    let sy = height as f32 / size.height().max(f32::EPSILON);
    let scale = sx.min(sy);

    let mut pixmap = blank(width.max(1), height.max(1))?;
    let dx = (width as f32 - size.width() * scale) / 2.0;
    let dy = (height as f32 - size.height() * scale) / 2.0;
    let transform = Transform::from_scale(scale, scale).post_translate(dx, dy);
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(pixmap)
}

/// Converts a decoded image into a premultiplied pixmap
pub fn from_image(img: &DynamicImage) -> Result<Pixmap> {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let size = IntSize::from_wh(w, h)
        .ok_or_else(|| Error::Image(format!("image has invalid size {}x{}", w, h)))?;

    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u32;
        px[0] = ((px[0] as u32 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u32 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u32 * a + 127) / 255) as u8;
    }
    Pixmap::from_vec(data, size).ok_or_else(|| Error::Image("pixel buffer size mismatch".into()))
}

/// Decodes inline image bytes and fits them inside a `max x max` box, keeping aspect
pub fn decode_fit(bytes: &[u8], max: u32) -> Result<Pixmap> {
    let img = image::load_from_memory(bytes)?;
    let fitted = img.resize(max, max, image::imageops::FilterType::Triangle);
    from_image(&fitted)
}

/// Scales a pixmap to exactly `width x height`
pub fn resize(src: &Pixmap, width: u32, height: u32) -> Result<Pixmap> {
    let mut out = blank(width, height)?;
    let sx = width as f32 / src.width() as f32;
    let sy = height as f32 / src.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    out.draw_pixmap(0, 0, src.as_ref(), &paint, Transform::from_scale(sx, sy), None);
    Ok(out)
}

/// Scales a pixmap to fit inside `max_w x max_h`, keeping aspect
pub fn fit_within(src: &Pixmap, max_w: u32, max_h: u32) -> Result<Pixmap> {
    let (w, h) = fit_size(src.width(), src.height(), max_w, max_h);
    resize(src, w, h)
}

pub fn fit_size(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (max_w.max(1), max_h.max(1));
    }
    let scale = (max_w as f32 / src_w as f32).min(max_h as f32 / src_h as f32);
    let w = ((src_w as f32 * scale).round() as u32).max(1);
    let h = ((src_h as f32 * scale).round() as u32).max(1);
    (w, h)
}

/// Keeps only the part of `target` covered by `mask`'s alpha
pub fn apply_mask(target: &mut Pixmap, mask: &Shape) -> Result<()> {
    let mask = mask.rasterize()?;
    let paint = PixmapPaint {
        blend_mode: BlendMode::DestinationIn,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(0, 0, mask.as_ref(), &paint, Transform::identity(), None);
    Ok(())
}

/// Clips `target` to a rounded rectangle of its own size
pub fn round_corners(target: &mut Pixmap, radius: f32) -> Result<()> {
    let mask = Shape::rounded(target.width(), target.height(), radius, Color::BLACK);
    apply_mask(target, &mask)
}

/// Clips `target` to the ellipse inscribed in its box
pub fn clip_circle(target: &mut Pixmap) -> Result<()> {
    let mask = Shape {
        width: target.width(),
        height: target.height(),
        outline: Outline::Ellipse,
        fill: Some(Color::BLACK),
        stroke: None,
    };
    apply_mask(target, &mask)
}

/// Source-over composite of `src` onto `dst` at `(left, top)`
pub fn overlay(dst: &mut Pixmap, src: &Pixmap, left: i32, top: i32) {
    dst.draw_pixmap(left, top, src.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
}

/// Source-over blend of a single `color` pixel at the given glyph coverage
pub fn blend_pixel(dst: &mut Pixmap, x: i32, y: i32, color: Color, coverage: u8) {
    if coverage == 0 || x < 0 || y < 0 || x as u32 >= dst.width() || y as u32 >= dst.height() {
        return;
    }
    let idx = y as usize * dst.width() as usize + x as usize;
    let [sr, sg, sb, sa] = color.premultiplied(coverage);
    let inv = 255 - sa as u32;
    let Some(px) = dst.pixels_mut().get_mut(idx) else {
        return;
    };
    let mix = |s: u8, d: u8| s as u32 + (d as u32 * inv + 127) / 255;
    let a = mix(sa, px.alpha()).min(255);
    let r = mix(sr, px.red()).min(a);
    let g = mix(sg, px.green()).min(a);
    let b = mix(sb, px.blue()).min(a);
    if let Some(c) = PremultipliedColorU8::from_rgba(r as u8, g as u8, b as u8, a as u8) {
        *px = c;
    }
}

/// Fills the whole pixmap with an opaque or translucent color
pub fn fill(dst: &mut Pixmap, color: Color) {
    dst.fill(color.to_skia());
}

pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
    pixmap.encode_png().map_err(|e| Error::Encode(e.to_string()))
}
