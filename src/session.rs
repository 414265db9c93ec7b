//! Session controller: owns the invoice being edited and the view state.

use chrono::NaiveDate;

use crate::export::document::DocumentWriter;
use crate::export::{ExportPipeline, ExportReport};
use crate::invoice::{HeaderField, Invoice, ItemField, ItemId};
use crate::rendering::layout::{render_invoice, PreviewOptions};
use crate::rendering::raster::Rasterizer;
use crate::rendering::VisualNode;
use crate::{Error, Result};

/// Which of the two screens is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Editing,
    /// Read-only snapshot taken on submit
    Previewing(Invoice),
}

#[derive(Debug, Clone)]
pub struct Session {
    invoice: Invoice,
    view: ViewState,
}

impl Session {
    pub fn new(date: NaiveDate) -> Self {
        Self::from_invoice(Invoice::new(date))
    }

    pub fn from_invoice(invoice: Invoice) -> Self {
        Self {
            invoice,
            view: ViewState::Editing,
        }
    }

    /// The draft under edit.
    pub fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// The snapshot being previewed, if any.
    pub fn preview(&self) -> Option<&Invoice> {
        match &self.view {
            ViewState::Previewing(snapshot) => Some(snapshot),
            ViewState::Editing => None,
        }
    }

    fn edit(&mut self, f: impl FnOnce(&Invoice) -> Invoice) -> Result<()> {
        if self.preview().is_some() {
            return Err(Error::InvalidState(
                "the form is not editable while previewing".into(),
            ));
        }
        self.invoice = f(&self.invoice);
        Ok(())
    }

    /// Append a blank item and return its id.
    pub fn add_item(&mut self) -> Result<ItemId> {
        self.edit(Invoice::add_item)?;
        self.invoice
            .items()
            .last()
            .map(|item| item.id())
            .ok_or_else(|| Error::Other("invoice has no items".into()))
    }

    pub fn remove_item(&mut self, id: ItemId) -> Result<()> {
        self.edit(|inv| inv.remove_item(id))
    }

    pub fn update_item(&mut self, id: ItemId, field: ItemField) -> Result<()> {
        self.edit(|inv| inv.update_item(id, field))
    }

    pub fn set_header_field(&mut self, field: HeaderField) -> Result<()> {
        self.edit(|inv| inv.set_header_field(field))
    }

    /// Validate the draft and switch to the preview.
    pub fn submit(&mut self) -> Result<&Invoice> {
        self.invoice.validate()?;
        self.view = ViewState::Previewing(self.invoice.clone());
        match &self.view {
            ViewState::Previewing(snapshot) => Ok(snapshot),
            ViewState::Editing => Err(Error::Other("preview snapshot missing".into())),
        }
    }

    /// Return to the form, keeping the draft.
    pub fn back_to_form(&mut self) {
        self.view = ViewState::Editing;
    }

    pub fn render_preview(&self, options: &PreviewOptions) -> Result<VisualNode> {
        let snapshot = self
            .preview()
            .ok_or_else(|| Error::InvalidState("nothing to preview; submit the form first".into()))?;
        Ok(render_invoice(snapshot, options))
    }

    /// Render the preview and run it through `pipeline`.
    pub async fn export<R, W>(
        &self,
        pipeline: &ExportPipeline<R, W>,
        options: &PreviewOptions,
    ) -> Result<ExportReport>
    where
        R: Rasterizer + 'static,
        W: DocumentWriter,
    {
        let node = self.render_preview(options)?;
        let number = self
            .preview()
            .map(|s| s.invoice_number().to_string())
            .unwrap_or_default();
        pipeline.export(&node, &number).await
    }
}
