//! Manual and automatic cropping.
//!
//! Manual crops take a top-left corner and a size as rates of the image
//! extent; the bottom-right corner is clamped to the last column and row.
//!
//! Auto crops look for where the detail is: Canny edges are detected with
//! thresholds taken from the gray intensity spread (`mean ∓ std`), and the crop
//! keeps `mean ± 2σ` of the edge pixel coordinates on each axis.
//!
//! Neither mode may produce an empty image. A crop that would is reported as
//! [`OperationError::DegenerateCrop`].

use super::OperationError;
use crate::imaging::calculations::{self, CropRect};
use crate::imaging::geometry;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Crop {
    pub is_auto: bool,
    /// Top-left corner as `(x, y)` rates.
    pub lt_position_rate: (f64, f64),
    /// Size as `(width, height)` rates.
    pub crop_size_rate: (f64, f64),
}

impl Default for Crop {
    fn default() -> Self {
        Self {
            is_auto: false,
            lt_position_rate: (0.0, 0.0),
            crop_size_rate: (1.0, 1.0),
        }
    }
}

fn check_rates(field: &str, (a, b): (f64, f64)) -> Result<(), String> {
    if (0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b) {
        Ok(())
    } else {
        Err(format!("{field}: ({a}, {b}) must be within [0, 1]"))
    }
}

impl Crop {
    pub fn validate(&self) -> Result<(), String> {
        if self.is_auto {
            return Ok(());
        }
        check_rates("lt_position_rate", self.lt_position_rate)?;
        check_rates("crop_size_rate", self.crop_size_rate)
    }

    /// A manual crop from the origin spanning at least the whole frame.
    fn covers_frame(&self) -> bool {
        self.lt_position_rate == (0.0, 0.0)
            && self.crop_size_rate.0 >= 1.0
            && self.crop_size_rate.1 >= 1.0
    }

    pub fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, OperationError> {
        let rect = if self.is_auto {
            auto_crop_rect(image)?
        } else if self.covers_frame() {
            return Ok(image.clone());
        } else {
            calculations::manual_crop_rect(
                (image.width(), image.height()),
                self.lt_position_rate,
                self.crop_size_rate,
            )
        };

        if rect.is_empty() {
            return Err(OperationError::DegenerateCrop(format!(
                "region [{}:{}, {}:{}] of a {}x{} image has no area",
                rect.top,
                rect.bottom,
                rect.left,
                rect.right,
                image.width(),
                image.height()
            )));
        }
        Ok(geometry::sub_image(image, rect))
    }
}

/// Edge-statistics crop region. 16-bit images are analysed on their 8-bit
/// gray conversion.
fn auto_crop_rect(image: &DynamicImage) -> Result<CropRect, OperationError> {
    let gray = image.to_luma8();
    let (low, high) = calculations::canny_thresholds(&gray);
    let edges = geometry::detect_edges(&gray, low, high);
    log::debug!("auto crop: canny thresholds low={low} high={high}");
    calculations::edge_bounds(&edges)
        .ok_or_else(|| OperationError::DegenerateCrop("no edges detected".into()))
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_auto {
            return write!(f, "auto");
        }
        write!(
            f,
            "lt_position_rate: ({}, {}), crop_size_rate: ({}, {})",
            self.lt_position_rate.0,
            self.lt_position_rate.1,
            self.crop_size_rate.0,
            self.crop_size_rate.1
        )
    }
}
