//! The closed set of image operations.
//!
//! | Kind | Parameters | Can fail |
//! |---|---|---|
//! | `Resize` | `height`, `width` (pixels or rate), `interpolation` | no |
//! | `Flip` | `vertical`, `horizontal` | no |
//! | `Rotate` | `rotate` (degrees), `center_rate` | no |
//! | `Crop` | `is_auto`, `lt_position_rate`, `crop_size_rate` | degenerate region |
//! | `Masking` | `mask`, `is_positive` | no (size mismatch is a warning) |
//! | `Background_Masking` | `mode`, `is_positive` | model failure |
//!
//! Every operation is a value: parameters are fixed when the [`Operation`] is
//! built and `apply` never mutates it. Operations are pure functions of
//! `(image, parameters)`, except background removal, which goes through the
//! [`BackgroundRemover`] in the [`OpContext`].

pub mod background;
pub mod crop;
pub mod flip;
pub mod masking;
pub mod resize;
pub mod rotate;

pub use background::BackgroundMasking;
pub use crop::Crop;
pub use flip::Flip;
pub use masking::{Mask, Masking};
pub use resize::{Extent, Resize};
pub use rotate::Rotate;

use crate::imaging::{BackendError, BackgroundRemover, ModelGate, NoRemover};
use crate::pipeline::CancelToken;
use image::DynamicImage;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Resize,
    Flip,
    Rotate,
    Crop,
    Masking,
    BackgroundMasking,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Resize,
        OperationKind::Flip,
        OperationKind::Rotate,
        OperationKind::Crop,
        OperationKind::Masking,
        OperationKind::BackgroundMasking,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Resize => "Resize",
            OperationKind::Flip => "Flip",
            OperationKind::Rotate => "Rotate",
            OperationKind::Crop => "Crop",
            OperationKind::Masking => "Masking",
            OperationKind::BackgroundMasking => "Background_Masking",
        }
    }

    /// Look up a kind by descriptor name.
    ///
    /// Case-insensitive; spaces and dashes count as underscores, so
    /// `"Background_Masking"`, `"background-masking"` and the editor's
    /// `"remove background"` all resolve.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match key.as_str() {
            "resize" => Some(OperationKind::Resize),
            "flip" => Some(OperationKind::Flip),
            "rotate" => Some(OperationKind::Rotate),
            "crop" => Some(OperationKind::Crop),
            "masking" | "mask" => Some(OperationKind::Masking),
            "background_masking" | "remove_background" => Some(OperationKind::BackgroundMasking),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Degenerate crop: {0}")]
    DegenerateCrop(String),
    #[error("Background model failed: {0}")]
    ExternalModel(#[source] BackendError),
    #[error("Unsupported image: {0}")]
    Unsupported(String),
}

/// Collaborators an operation may need at apply time.
pub struct OpContext<'a> {
    pub remover: &'a dyn BackgroundRemover,
    pub model_gate: &'a ModelGate,
    pub cancel: CancelToken,
}

impl<'a> OpContext<'a> {
    pub fn new(remover: &'a dyn BackgroundRemover, model_gate: &'a ModelGate) -> Self {
        Self {
            remover,
            model_gate,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

static NO_REMOVER: NoRemover = NoRemover;

impl Default for OpContext<'static> {
    /// Context without a background model; `Background_Masking` steps fail.
    fn default() -> Self {
        static GATE: std::sync::LazyLock<ModelGate> = std::sync::LazyLock::new(ModelGate::default);
        Self::new(&NO_REMOVER, &GATE)
    }
}

/// One configured step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Resize(Resize),
    Flip(Flip),
    Rotate(Rotate),
    Crop(Crop),
    Masking(Masking),
    BackgroundMasking(BackgroundMasking),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Resize(_) => OperationKind::Resize,
            Operation::Flip(_) => OperationKind::Flip,
            Operation::Rotate(_) => OperationKind::Rotate,
            Operation::Crop(_) => OperationKind::Crop,
            Operation::Masking(_) => OperationKind::Masking,
            Operation::BackgroundMasking(_) => OperationKind::BackgroundMasking,
        }
    }

    pub fn apply(
        &self,
        image: &DynamicImage,
        ctx: &OpContext<'_>,
    ) -> Result<DynamicImage, OperationError> {
        match self {
            Operation::Resize(op) => Ok(op.apply(image)),
            Operation::Flip(op) => Ok(op.apply(image)),
            Operation::Rotate(op) => Ok(op.apply(image)),
            Operation::Crop(op) => op.apply(image),
            Operation::Masking(op) => Ok(op.apply(image)),
            Operation::BackgroundMasking(op) => op.apply(image, ctx),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.kind())?;
        match self {
            Operation::Resize(op) => write!(f, "{op}")?,
            Operation::Flip(op) => write!(f, "{op}")?,
            Operation::Rotate(op) => write!(f, "{op}")?,
            Operation::Crop(op) => write!(f, "{op}")?,
            Operation::Masking(op) => write!(f, "{op}")?,
            Operation::BackgroundMasking(op) => write!(f, "{op}")?,
        }
        write!(f, ")")
    }
}
