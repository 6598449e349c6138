//! Background removal collaborator.
//!
//! Background removal is the one step that leaves the process: a segmentation
//! model decides which pixels are subject and which are background, and hands
//! back an RGBA image with the background made transparent. The engine treats
//! the model as a black box behind [`BackgroundRemover`].
//!
//! [`RembgCommand`] drives the `rembg` command line through two temporary PNG
//! files:
//!
//! ```text
//! rembg i [-m <model>] <tmp>/input.png <tmp>/output.png
//! ```
//!
//! Model calls are slow (seconds per image) and memory hungry, so concurrent
//! invocations across a parallel batch are capped by a [`ModelGate`]. A call
//! that outlives its timeout is killed and reported as a failure, which
//! releases its gate slot.

use super::backend::BackendError;
use super::raster;
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::process::{Command, Stdio};
use std::sync::{Condvar, Mutex};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Produces an RGBA image whose background pixels are transparent.
pub trait BackgroundRemover: Send + Sync {
    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError>;
}

/// Remover used when no model is configured. Every call fails.
pub struct NoRemover;

impl BackgroundRemover for NoRemover {
    fn remove(&self, _image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        Err(BackendError::External(
            "no background removal model configured".into(),
        ))
    }
}

/// Runs the `rembg` command line tool.
#[derive(Debug, Clone)]
pub struct RembgCommand {
    pub program: String,
    pub model: Option<String>,
    /// `None` waits for the program however long it takes.
    pub timeout: Option<Duration>,
}

impl RembgCommand {
    pub fn new(program: impl Into<String>, model: Option<String>) -> Self {
        Self {
            program: program.into(),
            model,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(&self, input: &std::path::Path, output: &std::path::Path) -> Vec<String> {
        let mut args = vec!["i".to_string()];
        if let Some(model) = &self.model {
            args.push("-m".into());
            args.push(model.clone());
        }
        args.push(input.to_string_lossy().into_owned());
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

impl Default for RembgCommand {
    fn default() -> Self {
        Self::new("rembg", None)
    }
}

impl BackgroundRemover for RembgCommand {
    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError> {
        let scratch = tempfile::TempDir::new()?;
        let input = scratch.path().join("input.png");
        let output = scratch.path().join("output.png");

        image
            .save_with_format(&input, ImageFormat::Png)
            .map_err(|e| BackendError::Encode {
                path: input.clone(),
                reason: e.to_string(),
            })?;

        // stderr goes to a file so a chatty model cannot fill a pipe and stall.
        let stderr_path = scratch.path().join("stderr.log");
        let mut child = Command::new(&self.program)
            .args(self.args(&input, &output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(File::create(&stderr_path)?)
            .spawn()
            .map_err(|e| BackendError::External(format!("failed to run {}: {e}", self.program)))?;

        let status = match self.timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    child.kill()?;
                    child.wait()?;
                    return Err(BackendError::External(format!(
                        "{} timed out after {}s",
                        self.program,
                        limit.as_secs_f64()
                    )));
                }
            },
            None => child.wait()?,
        };
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(BackendError::External(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                stderr.trim()
            )));
        }

        let removed = image::open(&output).map_err(|e| BackendError::Decode {
            path: output.clone(),
            reason: e.to_string(),
        })?;
        Ok(raster::normalize(removed))
    }
}

/// Counting semaphore capping concurrent model invocations.
pub struct ModelGate {
    available: Mutex<usize>,
    released: Condvar,
}

/// Slot held for the duration of one model call. Released on drop.
pub struct ModelPermit<'a> {
    gate: &'a ModelGate,
}

impl ModelGate {
    /// Gate admitting at most `slots` concurrent calls (at least one).
    pub fn new(slots: usize) -> Self {
        Self {
            available: Mutex::new(slots.max(1)),
            released: Condvar::new(),
        }
    }

    /// Block until a slot is free.
    pub fn acquire(&self) -> ModelPermit<'_> {
        let mut available = self
            .available
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *available -= 1;
        ModelPermit { gate: self }
    }
}

impl Default for ModelGate {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Drop for ModelPermit<'_> {
    fn drop(&mut self) {
        let mut available = self
            .gate
            .available
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *available += 1;
        self.gate.released.notify_one();
    }
}
