//! One input image bound to a pipeline and a destination.
//!
//! An [`ApplyUnit`] owns its decoded source image, so units never share pixel
//! buffers and can run on separate threads. Executing a unit runs the pipeline,
//! keeps the result in memory and writes it to
//! `destination_dir/file_name`, overwriting whatever is there.

use crate::imaging::{BackendError, ImageBackend};
use crate::operations::OpContext;
use crate::pipeline::{Pipeline, RunError, StepRecord};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("No pipeline set")]
    NoPipeline,
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("Write failed: {0}")]
    Write(#[source] BackendError),
}

#[derive(Debug)]
pub struct ApplyUnit {
    pub file_name: String,
    pub destination_dir: PathBuf,
    pub input_image: DynamicImage,
    /// Result of the last successful run, if any.
    pub output_image: Option<DynamicImage>,
    /// Per-step outcome of the last run.
    pub steps: Vec<StepRecord>,
    pipeline: Option<Arc<Pipeline>>,
}

impl ApplyUnit {
    pub fn new(
        file_name: impl Into<String>,
        input_image: DynamicImage,
        destination_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            destination_dir: destination_dir.into(),
            input_image,
            output_image: None,
            steps: Vec::new(),
            pipeline: None,
        }
    }

    /// Decode `source` and bind it to `destination_dir`.
    pub fn load(
        source: &Path,
        destination_dir: &Path,
        backend: &impl ImageBackend,
    ) -> Result<Self, BackendError> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BackendError::UnsupportedFormat(source.to_path_buf()))?;
        let image = backend.decode(source)?;
        Ok(Self::new(file_name, image, destination_dir))
    }

    pub fn set_pipeline(&mut self, pipeline: Arc<Pipeline>) {
        self.pipeline = Some(pipeline);
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_deref()
    }

    pub fn output_path(&self) -> PathBuf {
        self.destination_dir.join(&self.file_name)
    }

    /// Run the pipeline on the source image and write the result.
    ///
    /// The output image is kept even when the write fails. Returns the path
    /// written.
    pub fn execute(
        &mut self,
        backend: &impl ImageBackend,
        ctx: &OpContext<'_>,
    ) -> Result<PathBuf, ApplyError> {
        self.output_image = None;
        self.steps.clear();
        let pipeline = self.pipeline.clone().ok_or(ApplyError::NoPipeline)?;

        let run = pipeline.apply_tracked(&self.input_image, ctx);
        self.steps = run.steps;
        let output = self.output_image.insert(run.result?);

        let path = self.destination_dir.join(&self.file_name);
        std::fs::create_dir_all(&self.destination_dir)
            .map_err(|e| ApplyError::Write(BackendError::Io(e)))?;
        backend.encode(output, &path).map_err(ApplyError::Write)?;
        log::info!("{} -> {}", self.file_name, path.display());
        Ok(path)
    }
}
