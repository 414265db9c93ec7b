/// Rasterization of a visual node into an opaque bitmap

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use log::{debug, warn};

use crate::rendering::images::{ImageOrigin, ImageState};
use crate::rendering::paint::{PaintCommand, Rgba, GLYPH_SIZE};
use crate::rendering::{Bitmap, VisualNode};
use crate::{Error, ExportConfig, Result};

/// Capture settings for one rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Oversampling factor applied to every coordinate
    pub scale: f32,
    /// Opaque fill behind all content
    pub background: (u8, u8, u8),
    /// Capture width in node pixels
    pub width: u32,
    /// Capture height in node pixels
    pub height: u32,
    /// Whether CORS-approved remote images may be drawn
    pub allow_cross_origin_images: bool,
    /// Largest bitmap edge the rasterizer will allocate
    pub max_dimension: u32,
    /// Largest bitmap area the rasterizer will allocate
    pub max_area: u64,
}

impl RasterOptions {
    /// Options covering the node's full scrollable extent.
    ///
    /// The configured scale is lowered when the capture would not fit the
    /// canvas limits, so a tall node is captured at lower resolution instead
    /// of failing.
    pub fn for_node(node: &VisualNode, config: &ExportConfig) -> Self {
        let (width, height) = (node.scroll_width(), node.scroll_height());
        let scale = fit_scale(
            config.scale,
            width,
            height,
            config.max_canvas_dimension,
            config.max_canvas_area,
        );
        if scale < config.scale {
            warn!(
                "Capture of {}x{} at {}x exceeds the canvas limits; rasterizing at {:.3}x",
                width, height, config.scale, scale
            );
        }
        Self {
            scale,
            background: config.background,
            width,
            height,
            allow_cross_origin_images: config.allow_cross_origin_images,
            max_dimension: config.max_canvas_dimension,
            max_area: config.max_canvas_area,
        }
    }

    /// Output bitmap size.
    pub fn output_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.scale).ceil() as u32,
            (self.height as f32 * self.scale).ceil() as u32,
        )
    }
}

/// Largest scale up to `scale` whose output stays within both limits.
fn fit_scale(scale: f32, width: u32, height: u32, max_dimension: u32, max_area: u64) -> f32 {
    if width == 0 || height == 0 {
        return scale;
    }
    // One pixel and a small area margin absorb the `ceil` in `output_size`.
    let by_edge = max_dimension.saturating_sub(1) as f64 / width.max(height) as f64;
    let by_area = (max_area as f64 / (width as f64 * height as f64)).sqrt() * 0.999;
    let limit = by_edge.min(by_area);
    if scale as f64 <= limit {
        scale
    } else {
        limit as f32
    }
}

/// Turns a visual node into pixels.
pub trait Rasterizer: Send + Sync {
    fn render(&self, node: &VisualNode, options: &RasterOptions) -> Result<Bitmap>;
}

/// CPU rasterizer for the paint command set.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareRasterizer;

impl SoftwareRasterizer {
    pub fn new() -> Self {
        SoftwareRasterizer
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn render(&self, node: &VisualNode, options: &RasterOptions) -> Result<Bitmap> {
        if options.width == 0 || options.height == 0 {
            return Err(Error::RenderError("nothing to capture: node has zero extent".into()));
        }
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(Error::RenderError(format!("invalid scale {}", options.scale)));
        }
        let (out_w, out_h) = options.output_size();
        if out_w > options.max_dimension
            || out_h > options.max_dimension
            || (out_w as u64) * (out_h as u64) > options.max_area
        {
            return Err(Error::RenderError(format!(
                "capture of {}x{} exceeds the canvas limits ({} px edge, {} px area)",
                out_w, out_h, options.max_dimension, options.max_area
            )));
        }

        let (r, g, b) = options.background;
        let mut canvas = RgbImage::from_pixel(out_w, out_h, Rgb([r, g, b]));
        let s = options.scale;

        for cmd in node.commands() {
            match cmd {
                PaintCommand::SolidRect {
                    x,
                    y,
                    width,
                    height,
                    rgba,
                } => fill_rect(
                    &mut canvas,
                    *x as f32 * s,
                    *y as f32 * s,
                    *width as f32 * s,
                    *height as f32 * s,
                    *rgba,
                ),
                PaintCommand::Text {
                    x,
                    y,
                    text,
                    scale,
                    rgba,
                } => draw_text(
                    &mut canvas,
                    *x as f32 * s,
                    *y as f32 * s,
                    text,
                    *scale as f32 * s,
                    *rgba,
                ),
                PaintCommand::Image {
                    x,
                    y,
                    width,
                    height,
                    index,
                } => {
                    let Some(image) = node.images().get(*index) else {
                        warn!("Paint command references missing image #{}", index);
                        continue;
                    };
                    if !capturable(image.origin(), options.allow_cross_origin_images) {
                        warn!("Cross-origin image {} not capturable; left blank", image.src());
                        continue;
                    }
                    match image.state() {
                        ImageState::Loaded(pixels) => draw_image(
                            &mut canvas,
                            &pixels,
                            *x as f32 * s,
                            *y as f32 * s,
                            *width as f32 * s,
                            *height as f32 * s,
                        ),
                        _ => debug!("Image {} not loaded; left blank", image.src()),
                    }
                }
            }
        }

        Ok(Bitmap::from_rgb(canvas))
    }
}

fn capturable(origin: ImageOrigin, allow_cross_origin: bool) -> bool {
    match origin {
        ImageOrigin::Local => true,
        ImageOrigin::Remote { cors } => cors && allow_cross_origin,
    }
}

fn blend(dst: &mut Rgb<u8>, (r, g, b, a): Rgba) {
    if a == 255 {
        *dst = Rgb([r, g, b]);
        return;
    }
    let alpha = a as f32 / 255.0;
    for (d, s) in dst.0.iter_mut().zip([r, g, b]) {
        *d = (s as f32 * alpha + *d as f32 * (1.0 - alpha)).round() as u8;
    }
}

/// Pixel span `[start, end)` of a float edge pair, clipped to `0..limit`.
fn span(start: f32, len: f32, limit: u32) -> (u32, u32) {
    let lo = start.round().max(0.0) as u32;
    let hi = (start + len).round().max(0.0) as u32;
    (lo.min(limit), hi.min(limit))
}

fn fill_rect(canvas: &mut RgbImage, x: f32, y: f32, w: f32, h: f32, rgba: Rgba) {
    if rgba.3 == 0 {
        return;
    }
    let (x0, x1) = span(x, w, canvas.width());
    let (y0, y1) = span(y, h, canvas.height());
    for py in y0..y1 {
        for px in x0..x1 {
            blend(canvas.get_pixel_mut(px, py), rgba);
        }
    }
}

fn glyph(c: char) -> Option<[u8; 8]> {
    BASIC_FONTS.get(c).or_else(|| LATIN_FONTS.get(c))
}

fn draw_text(canvas: &mut RgbImage, x: f32, y: f32, text: &str, cell: f32, rgba: Rgba) {
    let advance = GLYPH_SIZE as f32 * cell;
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let gx = x + i as f32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for bit in 0..8 {
                if bits & (1 << bit) != 0 {
                    fill_rect(
                        canvas,
                        gx + bit as f32 * cell,
                        y + row as f32 * cell,
                        cell,
                        cell,
                        rgba,
                    );
                }
            }
        }
    }
}

fn draw_image(canvas: &mut RgbImage, src: &RgbaImage, x: f32, y: f32, w: f32, h: f32) {
    let (x0, x1) = span(x, w, u32::MAX);
    let (y0, y1) = span(y, h, u32::MAX);
    let (tw, th) = (x1 - x0, y1 - y0);
    if tw == 0 || th == 0 || src.width() == 0 || src.height() == 0 {
        return;
    }
    let scaled = imageops::resize(src, tw, th, FilterType::Triangle);
    for (dx, dy, px) in scaled.enumerate_pixels() {
        let (cx, cy) = (x0 + dx, y0 + dy);
        if cx >= canvas.width() || cy >= canvas.height() {
            continue;
        }
        let [r, g, b, a] = px.0;
        blend(canvas.get_pixel_mut(cx, cy), (r, g, b, a));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::images::EmbeddedImage;
    use image::Rgba as Px;

    fn opts(width: u32, height: u32) -> RasterOptions {
        RasterOptions {
            scale: 2.0,
            background: (255, 255, 255),
            width,
            height,
            allow_cross_origin_images: true,
            max_dimension: 32767,
            max_area: 268_435_456,
        }
    }

    #[test]
    fn output_is_scaled_and_opaque_white() {
        let node = VisualNode::new(30, 20);
        let bmp = SoftwareRasterizer::new().render(&node, &opts(30, 20)).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (60, 40));
        assert!(bmp.pixels().pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn solid_rect_is_scaled() {
        let mut node = VisualNode::new(10, 10);
        node.push(PaintCommand::SolidRect {
            x: 2,
            y: 2,
            width: 3,
            height: 3,
            rgba: (0, 0, 0, 255),
        });
        let bmp = SoftwareRasterizer::new().render(&node, &opts(10, 10)).unwrap();
        assert_eq!(bmp.pixels().get_pixel(4, 4).0, [0, 0, 0]);
        assert_eq!(bmp.pixels().get_pixel(9, 9).0, [0, 0, 0]);
        assert_eq!(bmp.pixels().get_pixel(10, 10).0, [255, 255, 255]);
        assert_eq!(bmp.pixels().get_pixel(3, 3).0, [255, 255, 255]);
    }

    #[test]
    fn text_leaves_ink() {
        let mut node = VisualNode::new(40, 10);
        node.push(PaintCommand::Text {
            x: 0,
            y: 0,
            text: "H".into(),
            scale: 1,
            rgba: (0, 0, 0, 255),
        });
        let bmp = SoftwareRasterizer::new().render(&node, &opts(40, 10)).unwrap();
        assert!(bmp.pixels().pixels().any(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn transparent_image_is_flattened_onto_background() {
        let mut node = VisualNode::new(4, 4);
        let clear = RgbaImage::from_pixel(2, 2, Px([255, 0, 0, 0]));
        node.embed_image(EmbeddedImage::loaded("clear.png", ImageOrigin::Local, clear), 0, 0, 4, 4);
        let bmp = SoftwareRasterizer::new().render(&node, &opts(4, 4)).unwrap();
        assert!(bmp.pixels().pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn loaded_image_is_drawn() {
        let mut node = VisualNode::new(4, 4);
        let red = RgbaImage::from_pixel(2, 2, Px([255, 0, 0, 255]));
        node.embed_image(EmbeddedImage::loaded("red.png", ImageOrigin::Local, red), 0, 0, 4, 4);
        let bmp = SoftwareRasterizer::new().render(&node, &opts(4, 4)).unwrap();
        assert_eq!(bmp.pixels().get_pixel(3, 3).0, [255, 0, 0]);
    }

    #[test]
    fn cross_origin_policy_blanks_images() {
        let red = RgbaImage::from_pixel(2, 2, Px([255, 0, 0, 255]));
        let mut node = VisualNode::new(4, 4);
        node.embed_image(
            EmbeddedImage::loaded("https://cdn/x.png", ImageOrigin::Remote { cors: true }, red.clone()),
            0,
            0,
            2,
            2,
        );
        node.embed_image(
            EmbeddedImage::loaded("https://other/y.png", ImageOrigin::Remote { cors: false }, red),
            2,
            2,
            2,
            2,
        );

        let bmp = SoftwareRasterizer::new().render(&node, &opts(4, 4)).unwrap();
        assert_eq!(bmp.pixels().get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(bmp.pixels().get_pixel(6, 6).0, [255, 255, 255]);

        let strict = RasterOptions {
            allow_cross_origin_images: false,
            ..opts(4, 4)
        };
        let bmp = SoftwareRasterizer::new().render(&node, &strict).unwrap();
        assert_eq!(bmp.pixels().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn rejects_empty_and_oversized_captures() {
        let r = SoftwareRasterizer::new();
        let node = VisualNode::new(0, 10);
        assert!(matches!(r.render(&node, &opts(0, 10)), Err(Error::RenderError(_))));

        let node = VisualNode::new(100, 100);
        let small = RasterOptions {
            max_dimension: 150,
            ..opts(100, 100)
        };
        assert!(matches!(r.render(&node, &small), Err(Error::RenderError(_))));

        let crowded = RasterOptions {
            max_area: 100 * 100,
            ..opts(100, 100)
        };
        assert!(matches!(r.render(&node, &crowded), Err(Error::RenderError(_))));
    }

    #[test]
    fn for_node_keeps_scale_when_it_fits() {
        let node = VisualNode::new(794, 1123);
        let o = RasterOptions::for_node(&node, &ExportConfig::default());
        assert_eq!(o.scale, 2.0);
        assert_eq!(o.output_size(), (1588, 2246));
    }

    #[test]
    fn for_node_lowers_scale_for_tall_nodes() {
        let config = ExportConfig::default();
        let node = VisualNode::new(794, 40_000);
        let o = RasterOptions::for_node(&node, &config);
        assert!(o.scale < 2.0);
        let (w, h) = o.output_size();
        assert!(h <= config.max_canvas_dimension, "{}", h);
        assert!(h > config.max_canvas_dimension - 16, "{}", h);
        assert!(w < 794);
    }

    #[test]
    fn for_node_lowers_scale_for_large_areas() {
        let config = ExportConfig::default();
        let node = VisualNode::new(20_000, 20_000);
        let o = RasterOptions::for_node(&node, &config);
        let (w, h) = o.output_size();
        assert!(w <= config.max_canvas_dimension && h <= config.max_canvas_dimension);
        assert!(w as u64 * h as u64 <= config.max_canvas_area);
    }
}
