//! Raster layouts the engine operates on.
//!
//! Every image flowing through a pipeline is a [`DynamicImage`] in one of six
//! layouts: gray, color, or color+alpha, each at 8 or 16 bits per channel.
//! Decoders can hand back other layouts (gray+alpha, floating point); those are
//! folded into the nearest supported layout by [`normalize`] at load time so
//! operations only ever have to handle the six.

use image::DynamicImage;

/// Number of channels per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray = 1,
    Color = 3,
    ColorAlpha = 4,
}

/// Bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Eight,
    Sixteen,
}

/// Channel count and depth of a supported image, `None` for any other layout.
pub fn layout(image: &DynamicImage) -> Option<(Channels, Depth)> {
    match image {
        DynamicImage::ImageLuma8(_) => Some((Channels::Gray, Depth::Eight)),
        DynamicImage::ImageRgb8(_) => Some((Channels::Color, Depth::Eight)),
        DynamicImage::ImageRgba8(_) => Some((Channels::ColorAlpha, Depth::Eight)),
        DynamicImage::ImageLuma16(_) => Some((Channels::Gray, Depth::Sixteen)),
        DynamicImage::ImageRgb16(_) => Some((Channels::Color, Depth::Sixteen)),
        DynamicImage::ImageRgba16(_) => Some((Channels::ColorAlpha, Depth::Sixteen)),
        _ => None,
    }
}

/// Fold any decoded layout into one of the supported ones.
///
/// Gray+alpha becomes color+alpha (a 2-channel buffer has no place in the
/// model), float buffers become 16-bit.
pub fn normalize(image: DynamicImage) -> DynamicImage {
    if layout(&image).is_some() {
        return image;
    }
    match image {
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageRgba8(image.to_rgba8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageRgba16(image.to_rgba16()),
        DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(image.to_rgb16()),
        _ if image.color().has_alpha() => DynamicImage::ImageRgba16(image.to_rgba16()),
        _ => DynamicImage::ImageRgb16(image.to_rgb16()),
    }
}

/// True when the image has no pixels.
pub fn is_empty(image: &DynamicImage) -> bool {
    image.width() == 0 || image.height() == 0
}

/// Pixel-for-pixel equality, including layout.
pub fn same_pixels(a: &DynamicImage, b: &DynamicImage) -> bool {
    a.color() == b.color()
        && a.width() == b.width()
        && a.height() == b.height()
        && a.as_bytes() == b.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, LumaA, Rgba};

    #[test]
    fn supported_layouts_are_recognised() {
        assert_eq!(
            layout(&DynamicImage::new_luma8(1, 1)),
            Some((Channels::Gray, Depth::Eight))
        );
        assert_eq!(
            layout(&DynamicImage::new_rgb16(1, 1)),
            Some((Channels::Color, Depth::Sixteen))
        );
        assert_eq!(
            layout(&DynamicImage::new_rgba8(1, 1)),
            Some((Channels::ColorAlpha, Depth::Eight))
        );
        assert_eq!(layout(&DynamicImage::new_luma_a8(1, 1)), None);
    }

    #[test]
    fn normalize_keeps_supported_layouts() {
        let img = DynamicImage::new_rgb8(4, 3);
        let out = normalize(img.clone());
        assert!(same_pixels(&img, &out));
    }

    #[test]
    fn normalize_expands_gray_alpha_to_rgba() {
        let img = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(2, 2, LumaA([90u8, 200])));
        let out = normalize(img);
        let DynamicImage::ImageRgba8(buf) = out else {
            panic!("expected rgba8");
        };
        assert_eq!(*buf.get_pixel(1, 1), Rgba([90, 90, 90, 200]));
    }

    #[test]
    fn normalize_converts_float_to_sixteen_bit() {
        let img = DynamicImage::new_rgba32f(2, 2);
        let out = normalize(img);
        assert_eq!(
            layout(&out),
            Some((Channels::ColorAlpha, Depth::Sixteen))
        );
    }

    #[test]
    fn empty_detection() {
        assert!(is_empty(&DynamicImage::new_rgb8(0, 5)));
        assert!(!is_empty(&DynamicImage::new_rgb8(1, 1)));
    }

    #[test]
    fn same_pixels_compares_layout() {
        let gray = DynamicImage::new_luma8(2, 2);
        let rgb = DynamicImage::new_rgb8(2, 2);
        assert!(!same_pixels(&gray, &rgb));
    }
}
