//! Output document capability consumed by the export pipeline.

use std::path::PathBuf;

use crate::export::page::{Orientation, PageFormat, Unit};
use crate::rendering::Bitmap;
use crate::Result;

/// Creates single-page documents.
pub trait DocumentWriter: Send + Sync {
    type Document: Document;

    fn new_document(
        &self,
        orientation: Orientation,
        unit: Unit,
        format: PageFormat,
    ) -> Result<Self::Document>;
}

/// A document under construction. Coordinates are in the document's unit
/// with the origin at the top-left corner of the page.
pub trait Document {
    fn page_width(&self) -> f64;

    fn page_height(&self) -> f64;

    /// Override the page size, e.g. to fit the page to its content.
    fn resize_page(&mut self, width: f64, height: f64);

    fn embed_image(&mut self, bitmap: &Bitmap, x: f64, y: f64, width: f64, height: f64) -> Result<()>;

    /// Serialize and deliver under `filename`. Returns where it was written.
    fn save(self, filename: &str) -> Result<PathBuf>;
}
