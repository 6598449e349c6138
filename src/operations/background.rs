//! Background removal step.
//!
//! Hands the image to the configured
//! [`BackgroundRemover`](crate::imaging::BackgroundRemover) while holding a
//! [`ModelGate`](crate::imaging::ModelGate) permit. The result always carries
//! an alpha channel. Modes other than `"rembg"` pass the image through.

use super::{OpContext, OperationError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REMBG_MODE: &str = "rembg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundMasking {
    pub mode: String,
    /// Reserved. Accepted in descriptors; the model output is used as is.
    pub is_positive: bool,
}

impl Default for BackgroundMasking {
    fn default() -> Self {
        Self {
            mode: REMBG_MODE.to_string(),
            is_positive: true,
        }
    }
}

impl BackgroundMasking {
    pub fn apply(
        &self,
        image: &DynamicImage,
        ctx: &OpContext<'_>,
    ) -> Result<DynamicImage, OperationError> {
        if self.mode != REMBG_MODE {
            log::debug!("background mode {:?} is inactive, passing through", self.mode);
            return Ok(image.clone());
        }

        let removed = {
            let _permit = ctx.model_gate.acquire();
            ctx.remover
                .remove(image)
                .map_err(OperationError::ExternalModel)?
        };

        if (removed.width(), removed.height()) != (image.width(), image.height()) {
            return Err(OperationError::Unsupported(format!(
                "background model returned {}x{} for a {}x{} image",
                removed.width(),
                removed.height(),
                image.width(),
                image.height()
            )));
        }

        Ok(with_alpha(removed))
    }
}

fn with_alpha(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgba8(_) | DynamicImage::ImageRgba16(_) => image,
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageRgb16(_) => {
            DynamicImage::ImageRgba16(image.to_rgba16())
        }
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

impl fmt::Display for BackgroundMasking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode: {}, is_positive: {}", self.mode, self.is_positive)
    }
}
