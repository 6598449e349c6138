//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP) | `image::ImageReader` with content sniffing |
//! | Identify | `image::image_dimensions` (header only) |
//! | Encode | `image::DynamicImage::save_with_format`, format from extension |
//!
//! Decoded buffers are folded into the supported layouts by
//! [`raster::normalize`](super::raster::normalize). On encode, layouts a format
//! cannot carry are converted first: JPEG has no alpha and no 16-bit mode, WebP
//! and BMP have no 16-bit mode.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::raster;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

const FORMAT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    FORMAT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled() && fmt.writing_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the file extensions this backend can both decode and encode.
pub fn supported_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn format_for(path: &Path) -> Result<ImageFormat, BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| BackendError::UnsupportedFormat(path.to_path_buf()))?;
    FORMAT_CANDIDATES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, fmt)| *fmt)
        .ok_or_else(|| BackendError::UnsupportedFormat(path.to_path_buf()))
}

/// Convert into a layout `format` can encode, borrowing when no change is needed.
fn encodable(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    match (format, image) {
        (ImageFormat::Jpeg, DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)) => {
            Cow::Borrowed(image)
        }
        (ImageFormat::Jpeg, DynamicImage::ImageLuma16(_)) => {
            Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
        }
        (ImageFormat::Jpeg, _) => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        (ImageFormat::WebP | ImageFormat::Bmp, DynamicImage::ImageLuma16(_)) => {
            Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
        }
        (ImageFormat::WebP | ImageFormat::Bmp, DynamicImage::ImageRgb16(_)) => {
            Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
        }
        (ImageFormat::WebP | ImageFormat::Bmp, DynamicImage::ImageRgba16(_)) => {
            Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
        }
        _ => Cow::Borrowed(image),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| BackendError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        let decoded = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| BackendError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(raster::normalize(decoded))
    }

    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), BackendError> {
        let format = format_for(path)?;
        if raster::is_empty(image) {
            return Err(BackendError::Encode {
                path: path.to_path_buf(),
                reason: "image has no pixels".into(),
            });
        }
        encodable(image, format)
            .save_with_format(path, format)
            .map_err(|e| BackendError::Encode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::gradient_rgb;
    use image::GenericImageView;

    #[test]
    fn supported_extensions_cover_jpg_and_png() {
        let exts = supported_extensions();
        for expected in &["jpg", "jpeg", "png"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn png_roundtrip_is_lossless() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("x.png");
        let img = gradient_rgb(30, 20);

        let backend = RustBackend::new();
        backend.encode(&img, &path).unwrap();
        let decoded = backend.decode(&path).unwrap();
        assert!(raster::same_pixels(&img, &decoded));
    }

    #[test]
    fn identify_reads_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("x.png");
        let backend = RustBackend::new();
        backend.encode(&gradient_rgb(64, 48), &path).unwrap();

        let dims = backend.identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 64, height: 48 });
    }

    #[test]
    fn jpeg_encode_drops_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("x.jpg");
        let img = DynamicImage::new_rgba8(16, 16);

        let backend = RustBackend::new();
        backend.encode(&img, &path).unwrap();
        let decoded = backend.decode(&path).unwrap();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn png_keeps_sixteen_bit_rgba() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("deep.png");
        let img = DynamicImage::new_rgba16(5, 5);

        let backend = RustBackend::new();
        backend.encode(&img, &path).unwrap();
        let decoded = backend.decode(&path).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgba16(_)));
    }

    #[test]
    fn encode_overwrites_existing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("x.png");
        let backend = RustBackend::new();
        backend.encode(&gradient_rgb(10, 10), &path).unwrap();
        backend.encode(&gradient_rgb(4, 2), &path).unwrap();

        assert_eq!(backend.decode(&path).unwrap().dimensions(), (4, 2));
    }

    #[test]
    fn encode_unknown_extension_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        let result = backend.encode(&gradient_rgb(2, 2), &tmp.path().join("x.xyz"));
        assert!(matches!(result, Err(BackendError::UnsupportedFormat(_))));
    }

    #[test]
    fn encode_empty_image_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        let result = backend.encode(&DynamicImage::new_rgb8(0, 0), &tmp.path().join("x.png"));
        assert!(matches!(result, Err(BackendError::Encode { .. })));
    }

    #[test]
    fn decode_corrupt_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let result = RustBackend::new().decode(&path);
        assert!(result.is_err());
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let result = RustBackend::new().decode(Path::new("/nonexistent/image.png"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
