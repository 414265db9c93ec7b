//! Rendering: the visual node handed to the export pipeline, and the bitmap
//! it is rasterized into.

pub mod images;
pub mod layout;
pub mod paint;
pub mod raster;

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbImage};
use sha2::{Digest, Sha256};

use crate::Result;
use images::EmbeddedImage;
use paint::PaintCommand;

/// A rendered invoice: ordered paint commands over a content box that may be
/// taller than any viewport, plus the images embedded in it.
#[derive(Debug, Clone)]
pub struct VisualNode {
    width: u32,
    height: u32,
    commands: Vec<PaintCommand>,
    images: Vec<EmbeddedImage>,
}

impl VisualNode {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Full content width, including overflow.
    pub fn scroll_width(&self) -> u32 {
        self.width
    }

    /// Full content height, including overflow.
    pub fn scroll_height(&self) -> u32 {
        self.height
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    pub fn images(&self) -> &[EmbeddedImage] {
        &self.images
    }

    pub fn push(&mut self, command: PaintCommand) {
        self.commands.push(command);
    }

    /// Place an image at the given box and register it for enumeration.
    pub fn embed_image(&mut self, image: EmbeddedImage, x: i32, y: i32, width: u32, height: u32) {
        let index = self.images.len();
        self.images.push(image);
        self.commands.push(PaintCommand::Image {
            x,
            y,
            width,
            height,
            index,
        });
    }
}

/// Opaque RGB pixels produced by a rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pixels: RgbImage,
}

impl Bitmap {
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Raw 8-bit RGB samples, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        PngEncoder::new(Cursor::new(&mut bytes)).write_image(
            self.pixels.as_raw(),
            self.width(),
            self.height(),
            ColorType::Rgb8,
        )?;
        Ok(bytes)
    }

    /// Hex SHA-256 over the dimensions and pixel data. Stable across encoders.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width().to_be_bytes());
        hasher.update(self.height().to_be_bytes());
        hasher.update(self.pixels.as_raw());
        hex::encode(hasher.finalize())
    }
}
