//! Resize to absolute pixel sizes or to a fraction of the current size.

use crate::imaging::{calculations, geometry};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A requested edge length.
///
/// In descriptors an integer is a pixel count and a float is a rate of the
/// current edge: `50` means 50 px, `0.5` means half. Values `<= 0` mean
/// "not requested".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extent {
    Pixels(i64),
    Rate(f64),
}

impl Extent {
    /// Resolve against the current edge length; `None` when not requested.
    pub fn resolve(self, current: u32) -> Option<u32> {
        match self {
            Extent::Pixels(px) if px > 0 => Some(px.min(calculations::MAX_EDGE as i64) as u32),
            Extent::Rate(rate) if rate > 0.0 => {
                Some(calculations::round_px(rate * current as f64).max(0) as u32)
            }
            _ => None,
        }
    }

    fn validate(self, field: &str) -> Result<(), String> {
        match self {
            Extent::Rate(rate) if !rate.is_finite() || rate > 1.0 => Err(format!(
                "{field}: rate {rate} must be within (0, 1]; use an integer for pixel sizes"
            )),
            Extent::Pixels(px) if px > calculations::MAX_EDGE as i64 => Err(format!(
                "{field}: {px}px exceeds the {}px limit",
                calculations::MAX_EDGE
            )),
            _ => Ok(()),
        }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Extent::Pixels(0)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Pixels(px) => write!(f, "{px}px"),
            Extent::Rate(rate) => write!(f, "{rate}x"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Resize {
    pub height: Extent,
    pub width: Extent,
    /// Reserved. Resizing always samples nearest-neighbour.
    pub interpolation: Option<i64>,
}

impl Resize {
    pub fn validate(&self) -> Result<(), String> {
        self.height.validate("height")?;
        self.width.validate("width")
    }

    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        let current = (image.width(), image.height());
        let target = calculations::resize_dimensions(
            current,
            self.width.resolve(current.0),
            self.height.resolve(current.1),
        );
        geometry::resize_exact(image, target.0, target.1)
    }
}

impl fmt::Display for Resize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "height: {}, width: {}", self.height, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::raster::same_pixels;
    use crate::test_helpers::gradient_rgb;

    #[test]
    fn extent_integer_parses_as_pixels() {
        let e: Extent = serde_json::from_str("50").unwrap();
        assert_eq!(e, Extent::Pixels(50));
    }

    #[test]
    fn extent_float_parses_as_rate() {
        let e: Extent = serde_json::from_str("0.5").unwrap();
        assert_eq!(e, Extent::Rate(0.5));
    }

    #[test]
    fn extent_resolve() {
        assert_eq!(Extent::Pixels(0).resolve(100), None);
        assert_eq!(Extent::Pixels(-3).resolve(100), None);
        assert_eq!(Extent::Pixels(40).resolve(100), Some(40));
        assert_eq!(Extent::Rate(0.25).resolve(100), Some(25));
        assert_eq!(Extent::Rate(0.0).resolve(100), None);
    }

    #[test]
    fn rate_above_one_is_rejected() {
        let resize = Resize {
            height: Extent::Rate(1.5),
            ..Default::default()
        };
        assert!(resize.validate().is_err());
    }

    #[test]
    fn oversized_pixel_request_is_rejected() {
        let resize = Resize {
            width: Extent::Pixels(100_000),
            ..Default::default()
        };
        let err = resize.validate().unwrap_err();
        assert!(err.contains("100000px"), "{err}");
    }

    #[test]
    fn unset_resize_is_noop() {
        let img = gradient_rgb(30, 20);
        assert!(same_pixels(&Resize::default().apply(&img), &img));
    }

    #[test]
    fn height_only_keeps_aspect_ratio() {
        let img = gradient_rgb(200, 100);
        let resize = Resize {
            height: Extent::Pixels(50),
            ..Default::default()
        };
        let out = resize.apply(&img);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn width_rate_keeps_aspect_ratio() {
        let img = gradient_rgb(200, 100);
        let resize = Resize {
            width: Extent::Rate(0.3),
            ..Default::default()
        };
        let out = resize.apply(&img);
        assert_eq!((out.width(), out.height()), (60, 30));
    }

    #[test]
    fn both_dimensions_are_literal() {
        let img = gradient_rgb(200, 100);
        let resize = Resize {
            height: Extent::Pixels(80),
            width: Extent::Pixels(20),
            interpolation: None,
        };
        let out = resize.apply(&img);
        assert_eq!((out.width(), out.height()), (20, 80));
    }

    #[test]
    fn repeated_absolute_height_is_idempotent() {
        let img = gradient_rgb(160, 120);
        let resize = Resize {
            height: Extent::Pixels(100),
            ..Default::default()
        };
        let once = resize.apply(&img);
        let twice = resize.apply(&once);
        assert!(same_pixels(&once, &twice));
    }

    #[test]
    fn unknown_field_rejected() {
        let result: Result<Resize, _> = serde_json::from_str(r#"{"height": 5, "depth": 2}"#);
        assert!(result.is_err());
    }
}
