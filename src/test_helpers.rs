//! Shared test utilities for the retouch test suite.
//!
//! Synthetic images with known pixel values, plus helpers that put image
//! files on disk for tests that go through a real codec.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let img = gradient_rgb(200, 100);
//! assert_eq!(img.get_pixel(10, 20).0, [10, 20, 30, 255]);
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_png(&tmp.path().join("x.png"), &img);
//! ```

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::ops::Range;
use std::path::Path;

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image where every pixel is distinct in at least one channel:
/// `R = x`, `G = y`, `B = x + y` (all mod 256).
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Gray (value 100) RGB image with a brighter (value 200) square covering
/// `span` on both axes. Gives Canny a single clear outline to find.
pub fn square_on_background(width: u32, height: u32, span: Range<u32>) -> DynamicImage {
    let gray = GrayImage::from_fn(width, height, |x, y| {
        if span.contains(&x) && span.contains(&y) {
            Luma([200])
        } else {
            Luma([100])
        }
    });
    DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(gray).to_rgb8())
}

// =========================================================================
// Files on disk
// =========================================================================

/// Encode `image` as PNG at `path`. Panics on failure.
pub fn write_png(path: &Path, image: &DynamicImage) {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

/// Encode `image` as JPEG at `path` (converted to RGB first). Panics on failure.
pub fn write_jpeg(path: &Path, image: &DynamicImage) {
    DynamicImage::ImageRgb8(image.to_rgb8())
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

/// Write bytes that no decoder accepts.
pub fn write_garbage(path: &Path) {
    std::fs::write(path, b"this is not an image").unwrap();
}
