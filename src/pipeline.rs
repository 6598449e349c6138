//! Ordered operation chains.
//!
//! A [`Pipeline`] is built once from a list of [`OperationDescriptor`]s and is
//! immutable afterwards. Building validates every descriptor, so a bad name or
//! parameter is reported before any image is touched. Applying folds the
//! operations over one image in order; the first failing step ends the chain.
//!
//! ## Descriptor files
//!
//! Pipelines are exchanged as a JSON array:
//!
//! ```json
//! [
//!   {"process": "Resize", "arg": {"height": 50}},
//!   {"process": "Flip", "arg": {"vertical": true}}
//! ]
//! ```
//!
//! or as TOML with one `[[step]]` table per operation:
//!
//! ```toml
//! [[step]]
//! process = "Resize"
//! arg = { height = 50 }
//! ```
//!
//! `name` and `parameters` are accepted in place of `process` and `arg`.

use crate::operations::{
    BackgroundMasking, Crop, Flip, Masking, OpContext, Operation, OperationError, OperationKind,
    Resize, Rotate,
};
use image::DynamicImage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown operation: {0:?}")]
    UnknownOperation(String),
    #[error("Invalid arguments for {kind}: {reason}")]
    InvalidArguments { kind: OperationKind, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure of one pipeline run. `index` is 0-based; messages count from 1.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Step {} ({kind}) failed: {source}", .index + 1)]
    Step {
        index: usize,
        kind: OperationKind,
        #[source]
        source: OperationError,
    },
    #[error("Cancelled before step {}", .index + 1)]
    Cancelled { index: usize },
}

/// An operation name with its raw parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    #[serde(alias = "name")]
    pub process: String,
    #[serde(default, alias = "parameters")]
    pub arg: serde_json::Value,
}

impl OperationDescriptor {
    pub fn new(process: impl Into<String>, arg: serde_json::Value) -> Self {
        Self {
            process: process.into(),
            arg,
        }
    }
}

fn parse_args<T: DeserializeOwned>(
    kind: OperationKind,
    arg: &serde_json::Value,
) -> Result<T, PipelineError> {
    let arg = if arg.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        arg.clone()
    };
    serde_json::from_value(arg).map_err(|e| PipelineError::InvalidArguments {
        kind,
        reason: e.to_string(),
    })
}

fn checked(kind: OperationKind, result: Result<(), String>) -> Result<(), PipelineError> {
    result.map_err(|reason| PipelineError::InvalidArguments { kind, reason })
}

impl TryFrom<&OperationDescriptor> for Operation {
    type Error = PipelineError;

    fn try_from(descriptor: &OperationDescriptor) -> Result<Self, PipelineError> {
        let kind = OperationKind::from_name(&descriptor.process)
            .ok_or_else(|| PipelineError::UnknownOperation(descriptor.process.clone()))?;
        let arg = &descriptor.arg;

        Ok(match kind {
            OperationKind::Resize => {
                let op: Resize = parse_args(kind, arg)?;
                checked(kind, op.validate())?;
                Operation::Resize(op)
            }
            OperationKind::Flip => Operation::Flip(parse_args::<Flip>(kind, arg)?),
            OperationKind::Rotate => {
                let op: Rotate = parse_args(kind, arg)?;
                checked(kind, op.validate())?;
                Operation::Rotate(op)
            }
            OperationKind::Crop => {
                let op: Crop = parse_args(kind, arg)?;
                checked(kind, op.validate())?;
                Operation::Crop(op)
            }
            OperationKind::Masking => Operation::Masking(parse_args::<Masking>(kind, arg)?),
            OperationKind::BackgroundMasking => {
                Operation::BackgroundMasking(parse_args::<BackgroundMasking>(kind, arg)?)
            }
        })
    }
}

/// Shared flag checked between pipeline steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Applied,
    Failed,
    /// Not reached: an earlier step failed or the run was cancelled.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    pub kind: OperationKind,
    pub status: StepStatus,
}

/// Result of [`Pipeline::apply_tracked`]: the outcome plus one record per step.
#[derive(Debug)]
pub struct TrackedRun {
    pub steps: Vec<StepRecord>,
    pub result: Result<DynamicImage, RunError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    ops: Vec<Operation>,
}

impl Pipeline {
    pub fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    /// Build and validate every descriptor. Fails on the first bad one.
    pub fn from_descriptors(descriptors: &[OperationDescriptor]) -> Result<Self, PipelineError> {
        let ops = descriptors
            .iter()
            .map(Operation::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ops })
    }

    /// Read a descriptor file: TOML when the extension is `.toml`, JSON otherwise.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        Self::from_descriptors(&load_descriptors(path)?)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    pub fn apply(
        &self,
        image: &DynamicImage,
        ctx: &OpContext<'_>,
    ) -> Result<DynamicImage, RunError> {
        self.apply_tracked(image, ctx).result
    }

    pub fn apply_tracked(&self, image: &DynamicImage, ctx: &OpContext<'_>) -> TrackedRun {
        let mut steps: Vec<StepRecord> = self
            .ops
            .iter()
            .map(|op| StepRecord {
                kind: op.kind(),
                status: StepStatus::Skipped,
            })
            .collect();

        let mut current = image.clone();
        for (index, op) in self.ops.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                log::debug!("cancelled before step {index}");
                return TrackedRun {
                    steps,
                    result: Err(RunError::Cancelled { index }),
                };
            }
            log::debug!("step {index}: {op}");
            match op.apply(&current, ctx) {
                Ok(next) => {
                    current = next;
                    steps[index].status = StepStatus::Applied;
                }
                Err(source) => {
                    steps[index].status = StepStatus::Failed;
                    return TrackedRun {
                        steps,
                        result: Err(RunError::Step {
                            index,
                            kind: op.kind(),
                            source,
                        }),
                    };
                }
            }
        }

        TrackedRun {
            steps,
            result: Ok(current),
        }
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineFile {
    #[serde(default)]
    step: Vec<OperationDescriptor>,
}

pub fn load_descriptors(path: &Path) -> Result<Vec<OperationDescriptor>, PipelineError> {
    let content = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        let file: PipelineFile = toml::from_str(&content)?;
        Ok(file.step)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}
