//! Mirror across the vertical and/or horizontal axis.
//!
//! The flags name the axis being flipped *across*: `vertical` mirrors columns
//! (left ↔ right), `horizontal` mirrors rows (top ↔ bottom). With both set the
//! column mirror runs first and the row mirror is applied to its result.

use crate::imaging::geometry;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Flip {
    pub vertical: bool,
    pub horizontal: bool,
}

impl Flip {
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match (self.vertical, self.horizontal) {
            (false, false) => image.clone(),
            (true, false) => geometry::mirror_columns(image),
            (false, true) => geometry::mirror_rows(image),
            (true, true) => geometry::mirror_rows(&geometry::mirror_columns(image)),
        }
    }
}

impl fmt::Display for Flip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vertical: {}, horizontal: {}", self.vertical, self.horizontal)
    }
}
