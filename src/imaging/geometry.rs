//! Geometric pixel primitives over the supported raster layouts.
//!
//! | Primitive | Crate / function |
//! |---|---|
//! | Resize to exact size | `image::DynamicImage::resize_exact` (nearest) |
//! | Flip | `image::DynamicImage::{fliph, flipv}` |
//! | Rotate about a pivot | `imageproc::geometric_transformations::rotate` (bilinear) |
//! | Sub-image | `image::DynamicImage::crop_imm` |
//! | Edge detection | `imageproc::edges::canny` |
//!
//! Every primitive borrows its input and returns a fresh buffer.

use super::calculations::CropRect;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, Primitive};
use imageproc::definitions::Clamp;
use imageproc::geometric_transformations::{Interpolation, rotate};

/// Resize to exactly `width`×`height` with nearest-neighbour sampling.
pub fn resize_exact(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if (image.width(), image.height()) == (width, height) {
        return image.clone();
    }
    image.resize_exact(width, height, FilterType::Nearest)
}

/// Mirror columns (left ↔ right).
pub fn mirror_columns(image: &DynamicImage) -> DynamicImage {
    image.fliph()
}

/// Mirror rows (top ↔ bottom).
pub fn mirror_rows(image: &DynamicImage) -> DynamicImage {
    image.flipv()
}

/// Rotate about `pivot` by `degrees` counter-clockwise (as seen on screen),
/// keeping the input size. Uncovered pixels are zero.
pub fn rotate_about(image: &DynamicImage, pivot: (f32, f32), degrees: f64) -> DynamicImage {
    // imageproc rotates clockwise for positive theta
    let theta = -(degrees.to_radians() as f32);
    match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(rotate_buffer(buf, pivot, theta)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(rotate_buffer(buf, pivot, theta)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(rotate_buffer(buf, pivot, theta)),
        DynamicImage::ImageLuma16(buf) => {
            DynamicImage::ImageLuma16(rotate_buffer(buf, pivot, theta))
        }
        DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(rotate_buffer(buf, pivot, theta)),
        DynamicImage::ImageRgba16(buf) => {
            DynamicImage::ImageRgba16(rotate_buffer(buf, pivot, theta))
        }
        other => {
            let buf = other.to_rgba16();
            DynamicImage::ImageRgba16(rotate_buffer(&buf, pivot, theta))
        }
    }
}

fn rotate_buffer<P>(
    buf: &ImageBuffer<P, Vec<P::Subpixel>>,
    pivot: (f32, f32),
    theta: f32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + Send + Sync,
    P::Subpixel: Send + Sync + Into<f32> + Clamp<f32>,
{
    let zeros = [<P::Subpixel as Primitive>::DEFAULT_MIN_VALUE; 4];
    let fill = *P::from_slice(&zeros[..P::CHANNEL_COUNT as usize]);
    rotate(buf, pivot, theta, Interpolation::Bilinear, fill)
}

/// Cut out `rect`. The rectangle must be non-empty and inside the image.
pub fn sub_image(image: &DynamicImage, rect: CropRect) -> DynamicImage {
    image.crop_imm(
        rect.left as u32,
        rect.top as u32,
        rect.width() as u32,
        rect.height() as u32,
    )
}

/// Canny edge map of a gray image. Edge pixels are 255, everything else 0.
///
/// imageproc's hysteresis admits pixels whose gradient is `>= low`, so a zero
/// low threshold is lifted to 1 to keep flat regions out of the edge set.
pub fn detect_edges(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    imageproc::edges::canny(gray, low.max(1.0), high.max(1.0))
}
