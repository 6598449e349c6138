//! Boolean masks applied per channel.
//!
//! Every channel value is kept where the mask is `true` and zeroed where it is
//! `false`. Color images without alpha gain an alpha channel carrying the mask
//! (full opacity for `true`, transparent for `false`); images that already have
//! alpha, and gray images, keep their channel count.
//!
//! A mask that does not match the image size leaves the image untouched and
//! logs a warning.

use crate::imaging::raster;
use image::{DynamicImage, ImageBuffer, Pixel, Primitive, Rgb, Rgba};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Row-major boolean grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<Self, String> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|row| row.len() != width) {
            return Err(format!(
                "mask row {bad} has {} entries, expected {width}",
                rows[bad].len()
            ));
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            bits: rows.into_iter().flatten().collect(),
        })
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let bits = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            bits,
        }
    }

    /// Non-zero gray level means `true`.
    pub fn from_gray(image: &DynamicImage) -> Self {
        let gray = image.to_luma16();
        Self::from_fn(gray.width(), gray.height(), |x, y| gray.get_pixel(x, y).0[0] != 0)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, String> {
        let image = image::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
        Ok(Self::from_gray(&image))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Out-of-range coordinates read as `false`.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y as usize) * (self.width as usize) + x as usize]
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaskSource {
    Rows(Vec<Vec<bool>>),
    Path(PathBuf),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaskingArgs {
    #[serde(default)]
    mask: Option<MaskSource>,
    #[serde(default = "default_positive")]
    is_positive: bool,
}

fn default_positive() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MaskingArgs")]
pub struct Masking {
    pub mask: Mask,
    /// Reserved. Accepted in descriptors and carried through, but the mask
    /// is applied the same way either way.
    pub is_positive: bool,
}

impl Default for Masking {
    fn default() -> Self {
        Self {
            mask: Mask::empty(),
            is_positive: true,
        }
    }
}

impl TryFrom<MaskingArgs> for Masking {
    type Error = String;

    fn try_from(args: MaskingArgs) -> Result<Self, String> {
        let mask = match args.mask {
            None => Mask::empty(),
            Some(MaskSource::Rows(rows)) => Mask::from_rows(rows)?,
            Some(MaskSource::Path(path)) => Mask::load(&path)?,
        };
        Ok(Self {
            mask,
            is_positive: args.is_positive,
        })
    }
}

impl Masking {
    pub fn new(mask: Mask, is_positive: bool) -> Self {
        Self { mask, is_positive }
    }

    /// Replace the stored mask.
    ///
    /// Always replaces when `force` is set or no mask is stored yet; otherwise
    /// only a mask of exactly the same shape is accepted. Returns whether the
    /// mask changed.
    pub fn set_mask(&mut self, mask: Mask, force: bool) -> bool {
        if force || self.mask.is_empty() || mask.dimensions() == self.mask.dimensions() {
            self.mask = mask;
            true
        } else {
            false
        }
    }

    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        let size = (image.width(), image.height());
        if self.mask.dimensions() != size {
            log::warn!(
                "mask is {}x{} but image is {}x{}; leaving image unchanged",
                self.mask.width,
                self.mask.height,
                size.0,
                size.1
            );
            return image.clone();
        }
        let mask = &self.mask;

        match image {
            DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(zero_outside(buf, mask)),
            DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(zero_outside(buf, mask)),
            DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(zero_outside(buf, mask)),
            DynamicImage::ImageRgba16(buf) => DynamicImage::ImageRgba16(zero_outside(buf, mask)),
            DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgba8(with_mask_alpha(buf, mask)),
            DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgba16(with_mask_alpha(buf, mask)),
            other => self.apply(&raster::normalize(other.clone())),
        }
    }
}

fn zero_outside<P: Pixel>(
    buf: &ImageBuffer<P, Vec<P::Subpixel>>,
    mask: &Mask,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let mut out = buf.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        if !mask.get(x, y) {
            px.apply(|_| <P::Subpixel as Primitive>::DEFAULT_MIN_VALUE);
        }
    }
    out
}

fn with_mask_alpha<S>(buf: &ImageBuffer<Rgb<S>, Vec<S>>, mask: &Mask) -> ImageBuffer<Rgba<S>, Vec<S>>
where
    S: Primitive,
    Rgb<S>: Pixel<Subpixel = S>,
    Rgba<S>: Pixel<Subpixel = S>,
{
    let zero = S::DEFAULT_MIN_VALUE;
    ImageBuffer::from_fn(buf.width(), buf.height(), |x, y| {
        if mask.get(x, y) {
            let [r, g, b] = buf.get_pixel(x, y).0;
            Rgba([r, g, b, S::DEFAULT_MAX_VALUE])
        } else {
            Rgba([zero, zero, zero, zero])
        }
    })
}

impl fmt::Display for Masking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.mask.dimensions();
        write!(f, "mask: {w}x{h}, is_positive: {}", self.is_positive)
    }
}
