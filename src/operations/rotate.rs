//! Rotate about a pivot given as a fraction of width/height.

use crate::imaging::{calculations, geometry};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rotate {
    /// Degrees, counter-clockwise as seen on screen.
    pub rotate: f64,
    /// Pivot as `(x, y)` rates of width and height.
    pub center_rate: (f64, f64),
}

impl Default for Rotate {
    fn default() -> Self {
        Self {
            rotate: 0.0,
            center_rate: (0.5, 0.5),
        }
    }
}

impl Rotate {
    pub fn validate(&self) -> Result<(), String> {
        if !self.rotate.is_finite() {
            return Err(format!("rotate: {} is not a finite angle", self.rotate));
        }
        let (x, y) = self.center_rate;
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return Err(format!("center_rate: ({x}, {y}) must be within [0, 1]"));
        }
        Ok(())
    }

    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        if self.rotate % 360.0 == 0.0 {
            return image.clone();
        }
        let pivot = calculations::rotation_pivot((image.width(), image.height()), self.center_rate);
        geometry::rotate_about(image, pivot, self.rotate)
    }
}

impl fmt::Display for Rotate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rotate: {}, center_rate: ({}, {})",
            self.rotate, self.center_rate.0, self.center_rate.1
        )
    }
}
