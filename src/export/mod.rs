//! Export pipeline: await images, rasterize, compose the page, deliver.
//!
//! The four stages run strictly in order. The pipeline yields while images
//! settle and while the rasterizer runs on the blocking pool; everything
//! else is synchronous. One pipeline runs at most one export at a time: a
//! second call while the first is in flight fails with
//! [`Error::ExportInProgress`].
//!
//! ```no_run
//! use invoicer::export::{pdf::PdfWriter, ExportPipeline};
//! use invoicer::rendering::{layout, raster::SoftwareRasterizer};
//! use invoicer::{ExportConfig, Invoice};
//!
//! # async fn run(invoice: Invoice) -> invoicer::Result<()> {
//! let pipeline = ExportPipeline::new(
//!     ExportConfig::default(),
//!     SoftwareRasterizer::new(),
//!     PdfWriter::new("out"),
//! )?;
//! let node = layout::render_invoice(&invoice, &Default::default());
//! let report = pipeline.export(&node, invoice.invoice_number()).await?;
//! println!("saved {}", report.path.display());
//! # Ok(())
//! # }
//! ```

pub mod document;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod page;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::invoice::export_filename;
use crate::rendering::images::{await_images, ImageSummary};
use crate::rendering::raster::{RasterOptions, Rasterizer};
use crate::rendering::{Bitmap, VisualNode};
use crate::{Error, ExportConfig, Result};
use document::{Document, DocumentWriter};
use page::{compose_page, PageLayout};

/// What one export produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    /// Where the document was delivered
    pub path: PathBuf,
    /// `Invoice-<invoice number>.pdf`
    pub filename: String,
    /// How the embedded images settled
    pub images: ImageSummary,
    /// Oversampling actually used; below the configured scale when the
    /// capture had to fit the canvas limits
    pub scale: f32,
    pub bitmap_width: u32,
    pub bitmap_height: u32,
    /// Image box on the page, in document units
    pub page: PageLayout,
    /// SHA-256 of the captured bitmap
    pub digest: String,
}

/// Clears the in-flight flag when the export ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ExportPipeline<R, W> {
    config: ExportConfig,
    rasterizer: Arc<R>,
    writer: W,
    in_flight: AtomicBool,
}

impl<R, W> ExportPipeline<R, W>
where
    R: Rasterizer + 'static,
    W: DocumentWriter,
{
    pub fn new(config: ExportConfig, rasterizer: R, writer: W) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rasterizer: Arc::new(rasterizer),
            writer,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Whether an export is currently running.
    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ExportInProgress)?;
        Ok(InFlight(&self.in_flight))
    }

    /// Run all four stages for `node` and deliver `Invoice-<invoice_number>.pdf`.
    ///
    /// A rasterization failure is returned to the caller and nothing is
    /// written.
    pub async fn export(&self, node: &VisualNode, invoice_number: &str) -> Result<ExportReport> {
        let _guard = self.begin()?;
        let filename = export_filename(invoice_number);
        info!("Exporting {}", filename);

        let images = await_images(node, self.config.image_timeout).await;
        debug!(
            "Images settled: {} loaded, {} failed, {} timed out",
            images.loaded, images.failed, images.timed_out
        );

        let options = RasterOptions::for_node(node, &self.config);
        let scale = options.scale;
        let bitmap = self.rasterize(node, options).await?;
        debug!(
            "Rasterized {}x{} bitmap at {}x",
            bitmap.width(),
            bitmap.height(),
            scale
        );

        let mut doc = self.writer.new_document(
            self.config.orientation,
            self.config.unit,
            self.config.format,
        )?;
        let page = compose_page(bitmap.width(), bitmap.height(), doc.page_width())?;
        if self.config.fit_page_to_content {
            doc.resize_page(page.width, page.height);
        }
        debug!(
            "Composed page {:.1}x{:.1} (page height {:.1})",
            page.width,
            page.height,
            doc.page_height()
        );

        doc.embed_image(&bitmap, 0.0, 0.0, page.width, page.height)?;
        let path = doc.save(&filename)?;
        info!("Delivered {}", path.display());

        Ok(ExportReport {
            path,
            filename,
            images,
            scale,
            bitmap_width: bitmap.width(),
            bitmap_height: bitmap.height(),
            page,
            digest: bitmap.digest(),
        })
    }

    async fn rasterize(&self, node: &VisualNode, options: RasterOptions) -> Result<Bitmap> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let node = node.clone();
        tokio::task::spawn_blocking(move || rasterizer.render(&node, &options))
            .await
            .map_err(|e| Error::RenderError(format!("rasterizer task failed: {}", e)))?
    }
}
