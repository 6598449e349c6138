//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the engine needs
//! from storage: identify, decode and encode. Everything between decode and
//! encode happens on in-memory buffers and never touches a backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("External tool failed: {0}")]
    External(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image codec backends.
///
/// `Sync` so a single backend can be shared by every rayon worker in a batch.
pub trait ImageBackend: Sync {
    /// Get image dimensions without a full decode where the format allows it.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode an image into one of the supported raster layouts.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode an image to `path`, overwriting any existing file.
    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), BackendError>;
}
