//! Embedded images and the wait for them to settle.
//!
//! Each [`EmbeddedImage`] observes a load that is driven elsewhere (a spawned
//! file read, a test, a network fetch). The load settles exactly once, as
//! loaded or failed; [`await_images`] resolves when every image in a node has
//! settled. A failed image never aborts the wait.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use image::RgbaImage;
use log::{debug, warn};
use tokio::sync::watch;

use crate::rendering::VisualNode;
use crate::{Error, Result};

/// Where an image was loaded from. Remote images are subject to the
/// cross-origin capture policy of the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Local,
    /// `cors` reports whether the remote host permitted cross-origin reads.
    Remote { cors: bool },
}

#[derive(Debug, Clone)]
pub enum ImageState {
    Pending,
    Loaded(Arc<RgbaImage>),
    Failed(String),
}

/// Outcome of one image's load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Loaded,
    Failed(String),
}

/// An image referenced by a visual node.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    src: String,
    origin: ImageOrigin,
    state: watch::Receiver<ImageState>,
}

/// Write side of a pending image. Dropping it before settling marks the
/// image as failed.
#[derive(Debug)]
pub struct ImageSettler {
    tx: watch::Sender<ImageState>,
}

impl ImageSettler {
    pub fn loaded(self, pixels: RgbaImage) {
        self.tx.send_replace(ImageState::Loaded(Arc::new(pixels)));
    }

    pub fn failed(self, reason: impl Into<String>) {
        self.tx.send_replace(ImageState::Failed(reason.into()));
    }
}

impl Drop for ImageSettler {
    fn drop(&mut self) {
        let pending = matches!(*self.tx.borrow(), ImageState::Pending);
        if pending {
            self.tx
                .send_replace(ImageState::Failed("image loader dropped".into()));
        }
    }
}

impl EmbeddedImage {
    /// A pending image plus the handle that settles it.
    pub fn pending(src: impl Into<String>, origin: ImageOrigin) -> (Self, ImageSettler) {
        let (tx, rx) = watch::channel(ImageState::Pending);
        let image = Self {
            src: src.into(),
            origin,
            state: rx,
        };
        (image, ImageSettler { tx })
    }

    /// An image that is already decoded.
    pub fn loaded(src: impl Into<String>, origin: ImageOrigin, pixels: RgbaImage) -> Self {
        let (image, settler) = Self::pending(src, origin);
        settler.loaded(pixels);
        image
    }

    /// An image whose load already failed.
    pub fn failed(src: impl Into<String>, reason: impl Into<String>) -> Self {
        let (image, settler) = Self::pending(src, ImageOrigin::Local);
        settler.failed(reason);
        image
    }

    /// Decode encoded bytes (PNG or JPEG) synchronously.
    pub fn from_bytes(src: impl Into<String>, origin: ImageOrigin, bytes: &[u8]) -> Result<Self> {
        Ok(Self::loaded(src, origin, decode(bytes)?))
    }

    /// Start loading a local file in the background. Must be called from
    /// within a tokio runtime.
    pub fn load_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (image, settler) = Self::pending(path.display().to_string(), ImageOrigin::Local);
        tokio::spawn(async move {
            match read_and_decode(path.clone()).await {
                Ok(pixels) => {
                    debug!("Loaded image {}", path.display());
                    settler.loaded(pixels);
                }
                Err(e) => {
                    warn!("Failed to load image {}: {}", path.display(), e);
                    settler.failed(e.to_string());
                }
            }
        });
        image
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn origin(&self) -> ImageOrigin {
        self.origin
    }

    /// Current state without waiting.
    pub fn state(&self) -> ImageState {
        self.state.borrow().clone()
    }

    /// Wait until the load settles.
    pub async fn settled(&self) -> Settled {
        let mut rx = self.state.clone();
        loop {
            let outcome = match &*rx.borrow_and_update() {
                ImageState::Pending => None,
                ImageState::Loaded(_) => Some(Settled::Loaded),
                ImageState::Failed(reason) => Some(Settled::Failed(reason.clone())),
            };
            if let Some(outcome) = outcome {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Sender gone: its Drop already published the final state.
                return match &*rx.borrow() {
                    ImageState::Loaded(_) => Settled::Loaded,
                    ImageState::Failed(reason) => Settled::Failed(reason.clone()),
                    ImageState::Pending => Settled::Failed("image loader dropped".into()),
                };
            }
        }
    }
}

/// Decode an encoded image into RGBA pixels.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

async fn read_and_decode(path: PathBuf) -> Result<RgbaImage> {
    let bytes = tokio::fs::read(&path).await?;
    tokio::task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| Error::ImageError(format!("decoder task failed: {}", e)))?
}

/// Counts of how the images of one node settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSummary {
    pub loaded: usize,
    pub failed: usize,
    /// Still pending when the wait limit elapsed.
    pub timed_out: usize,
}

impl ImageSummary {
    pub fn total(&self) -> usize {
        self.loaded + self.failed + self.timed_out
    }
}

/// Wait for every image in `node` to settle.
///
/// Resolves immediately for a node without images. With `timeout == None`
/// a load that never settles stalls the wait; with a limit, images still
/// pending when it elapses are reported as `timed_out` and left blank.
pub async fn await_images(node: &VisualNode, timeout: Option<Duration>) -> ImageSummary {
    let images = node.images();
    if images.is_empty() {
        return ImageSummary::default();
    }

    let waits = images.iter().map(|image| async move {
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, image.settled()).await.ok(),
            None => Some(image.settled().await),
        };
        (image.src(), outcome)
    });

    let mut summary = ImageSummary::default();
    for (src, outcome) in join_all(waits).await {
        match outcome {
            Some(Settled::Loaded) => summary.loaded += 1,
            Some(Settled::Failed(reason)) => {
                warn!("Image {} failed to load ({}); exporting without it", src, reason);
                summary.failed += 1;
            }
            None => {
                warn!("Image {} still loading after the wait limit; exporting without it", src);
                summary.timed_out += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settler_drop_marks_failed() {
        let (image, settler) = EmbeddedImage::pending("logo.png", ImageOrigin::Local);
        assert!(matches!(image.state(), ImageState::Pending));
        drop(settler);
        assert!(matches!(image.state(), ImageState::Failed(_)));
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        let err = EmbeddedImage::from_bytes("x", ImageOrigin::Local, b"not an image").unwrap_err();
        assert!(matches!(err, Error::ImageError(_)));
    }

    #[tokio::test]
    async fn settled_waits_for_the_settler() {
        let (image, settler) = EmbeddedImage::pending("logo.png", ImageOrigin::Local);
        let waiter = tokio::spawn(async move { image.settled().await });
        tokio::task::yield_now().await;
        settler.loaded(RgbaImage::new(1, 1));
        assert_eq!(waiter.await.unwrap(), Settled::Loaded);
    }

    #[tokio::test]
    async fn already_failed_image_settles_immediately() {
        let image = EmbeddedImage::failed("gone.png", "404");
        assert_eq!(image.settled().await, Settled::Failed("404".into()));
    }
}
