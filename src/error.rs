//! Error types for the invoice builder

use thiserror::Error;

/// Result type alias for invoice and export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing, rendering, or exporting an invoice
#[derive(Error, Debug)]
pub enum Error {
    /// A required form field is empty
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation not allowed in the current view state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// An embedded image could not be read or decoded
    #[error("Image error: {0}")]
    ImageError(String),

    /// Failed to rasterize the visual node
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to build or serialize the output document
    #[error("Document error: {0}")]
    DocumentError(String),

    /// An export is already running against this pipeline
    #[error("An export is already in progress")]
    ExportInProgress,

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err.to_string())
    }
}
