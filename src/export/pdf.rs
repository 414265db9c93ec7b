//! PDF output backed by `printpdf`.
//!
//! Images are collected while the page is being composed and written out in
//! one go on `save`, so the page can still be resized after placement.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use log::debug;
use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument, Px,
};

use crate::export::document::{Document, DocumentWriter};
use crate::export::page::{Orientation, PageFormat, Unit};
use crate::rendering::Bitmap;
use crate::{Error, ExportConfig, Result};

/// Writes PDFs into a delivery directory.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    output_dir: PathBuf,
    title: String,
}

impl PdfWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            title: "Invoice".to_string(),
        }
    }

    /// Deliver into `config.output_dir`.
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}

impl DocumentWriter for PdfWriter {
    type Document = PdfPage;

    fn new_document(
        &self,
        orientation: Orientation,
        unit: Unit,
        format: PageFormat,
    ) -> Result<PdfPage> {
        let (width, height) = format.size(orientation, unit);
        Ok(PdfPage {
            output_dir: self.output_dir.clone(),
            title: self.title.clone(),
            unit,
            width,
            height,
            placements: Vec::new(),
        })
    }
}

struct Placement {
    bitmap: Bitmap,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// A single PDF page being composed.
pub struct PdfPage {
    output_dir: PathBuf,
    title: String,
    unit: Unit,
    width: f64,
    height: f64,
    placements: Vec<Placement>,
}

impl Document for PdfPage {
    fn page_width(&self) -> f64 {
        self.width
    }

    fn page_height(&self) -> f64 {
        self.height
    }

    fn resize_page(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn embed_image(&mut self, bitmap: &Bitmap, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(Error::DocumentError("cannot embed an empty bitmap".into()));
        }
        if !(width > 0.0 && height > 0.0) {
            return Err(Error::DocumentError(format!(
                "invalid image box {}x{}",
                width, height
            )));
        }
        self.placements.push(Placement {
            bitmap: bitmap.clone(),
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn save(self, filename: &str) -> Result<PathBuf> {
        let page_w = self.unit.to_mm(self.width);
        let page_h = self.unit.to_mm(self.height);
        let (doc, page1, layer1) =
            PdfDocument::new(&self.title, Mm(page_w as f32), Mm(page_h as f32), "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);

        for p in self.placements {
            let (px_w, px_h) = (p.bitmap.width(), p.bitmap.height());
            let w_mm = self.unit.to_mm(p.width);
            let h_mm = self.unit.to_mm(p.height);

            // printpdf sizes the image from its dpi; pick the dpi that yields
            // the requested width and stretch vertically for the rest.
            let dpi = px_w as f64 / (w_mm / 25.4);
            let natural_h = px_h as f64 / dpi * 25.4;
            let scale_y = h_mm / natural_h;

            let image = Image::from(ImageXObject {
                width: Px(px_w as usize),
                height: Px(px_h as usize),
                color_space: ColorSpace::Rgb,
                bits_per_component: ColorBits::Bit8,
                interpolate: true,
                image_data: p.bitmap.as_raw().to_vec(),
                image_filter: None,
                clipping_bbox: None,
                smask: None,
            });

            // PDF space starts at the bottom-left corner.
            let x_mm = self.unit.to_mm(p.x);
            let y_mm = page_h - self.unit.to_mm(p.y) - h_mm;
            image.add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(x_mm as f32)),
                    translate_y: Some(Mm(y_mm as f32)),
                    dpi: Some(dpi as f32),
                    scale_y: Some(scale_y as f32),
                    ..Default::default()
                },
            );
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(filename);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        doc.save(&mut writer)
            .map_err(|e| Error::DocumentError(e.to_string()))?;
        debug!("Wrote {} ({:.1}x{:.1} mm)", path.display(), page_w, page_h);
        Ok(path)
    }
}
