//! Invoicer
//!
//! Build an invoice from a customer, some metadata and a list of line items,
//! render it as a preview, and export the preview as a single-page PDF whose
//! only content is a full-width raster image of the invoice.
//!
//! # Pipeline
//!
//! - **Model** ([`invoice`]): immutable snapshots, every edit returns a new value
//! - **Preview** ([`rendering::layout`]): invoice → [`rendering::VisualNode`]
//! - **Export** ([`export`]): wait for images, rasterize at 2x on white,
//!   fit the bitmap to the page width, save `Invoice-<number>.pdf`
//!
//! # Example
//!
//! ```no_run
//! use invoicer::export::{pdf::PdfWriter, ExportPipeline};
//! use invoicer::rendering::{layout::PreviewOptions, raster::SoftwareRasterizer};
//! use invoicer::{ExportConfig, HeaderField, ItemField, Session};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(chrono::Local::now().date_naive());
//! session.set_header_field(HeaderField::CustomerName("Budi".into()))?;
//! session.set_header_field(HeaderField::CustomerPhone("0812".into()))?;
//! session.set_header_field(HeaderField::InvoiceNumber("INV-001".into()))?;
//! let id = session.invoice().items()[0].id();
//! session.update_item(id, ItemField::Description("PPF Install".into()))?;
//! session.update_item(id, ItemField::Quantity("2".into()))?;
//! session.update_item(id, ItemField::UnitPrice("250000".into()))?;
//! session.submit()?;
//!
//! let pipeline = ExportPipeline::new(
//!     ExportConfig::default(),
//!     SoftwareRasterizer::new(),
//!     PdfWriter::new("."),
//! )?;
//! let report = session.export(&pipeline, &PreviewOptions::default()).await?;
//! assert_eq!(report.filename, "Invoice-INV-001.pdf");
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod currency;
pub mod export;
pub mod invoice;
pub mod rendering;
pub mod session;

pub use export::page::{Orientation, PageFormat, Unit};
pub use export::{ExportPipeline, ExportReport};
pub use invoice::{HeaderField, Invoice, ItemField, ItemId, LineItem};
pub use session::{Session, ViewState};

/// Configuration for the export pipeline
///
/// The defaults reproduce the classic browser export: 2x oversampling on an
/// opaque white background, cross-origin images allowed where the host
/// permits it, a portrait A4 page measured in CSS pixels, and no limit on how
/// long the pipeline waits for images. The canvas limits follow what browsers
/// allocate; a capture that would exceed them is taken at a reduced scale.
///
/// # Examples
///
/// ```
/// let cfg = invoicer::ExportConfig::default();
/// assert_eq!(cfg.scale, 2.0);
/// assert!(cfg.image_timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Oversampling factor for rasterization
    pub scale: f32,
    /// Opaque background painted under the capture
    pub background: (u8, u8, u8),
    /// Whether CORS-approved remote images are captured
    pub allow_cross_origin_images: bool,
    /// Page orientation
    pub orientation: Orientation,
    /// Unit the document is measured in
    pub unit: Unit,
    /// Paper format; its width is the target width of the bitmap
    pub format: PageFormat,
    /// Upper bound on the image wait (`None` waits indefinitely)
    pub image_timeout: Option<Duration>,
    /// Resize the page to the scaled bitmap instead of keeping the paper height
    pub fit_page_to_content: bool,
    /// Largest bitmap edge, in pixels
    pub max_canvas_dimension: u32,
    /// Largest bitmap area, in pixels
    pub max_canvas_area: u64,
    /// Directory exported documents are delivered to
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: (255, 255, 255),
            allow_cross_origin_images: true,
            orientation: Orientation::Portrait,
            unit: Unit::Px,
            format: PageFormat::A4,
            image_timeout: None,
            fit_page_to_content: false,
            max_canvas_dimension: 32767,
            max_canvas_area: 268_435_456,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::ConfigError(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.max_canvas_dimension == 0 || self.max_canvas_area == 0 {
            return Err(Error::ConfigError(
                "canvas limits must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.background, (255, 255, 255));
        assert_eq!(config.format, PageFormat::A4);
        assert_eq!(config.orientation, Orientation::Portrait);
        assert!(!config.fit_page_to_content);
        assert_eq!(config.max_canvas_dimension, 32767);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_scale_rejected() {
        for scale in [0.0, -1.0, f32::NAN] {
            let config = ExportConfig {
                scale,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
        }
    }

    #[test]
    fn test_zero_canvas_area_rejected() {
        let config = ExportConfig {
            max_canvas_area: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }
}
