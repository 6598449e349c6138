//! Batch coordination: one pipeline over a directory of images.
//!
//! ## Lifecycle
//!
//! ```text
//! input/                  Batch::load          units        Batch::run
//! ├── a.jpg   ──decode──►  ApplyUnit(a.jpg) ──pipeline──► output/a.jpg
//! ├── b.png   ──decode──►  ApplyUnit(b.png) ──pipeline──► output/b.png
//! └── bad.jpg ──decode──✗  LoadFailure
//!
//! output/ listing ──Batch::reconcile──► tracked outputs (stale entries dropped)
//! ```
//!
//! ## Parallelism
//!
//! Units run in parallel on the rayon pool. Each unit owns its source and
//! output buffers and writes a distinct file, so no locking is needed. Steps
//! inside a unit always run in order. Two inputs with the same file name
//! cannot occur within one directory listing; if a caller builds such units
//! by hand, the last write wins.
//!
//! ## Failure isolation
//!
//! A file that does not decode becomes a [`LoadFailure`]; a unit whose
//! pipeline or write fails is reported as [`UnitStatus::Failed`]. Neither
//! stops the rest of the batch.

use crate::apply::{ApplyError, ApplyUnit};
use crate::imaging::{BackendError, ImageBackend};
use crate::operations::OpContext;
use crate::pipeline::{Pipeline, RunError, StepRecord};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// List the image files directly inside `dir`, sorted by file name.
///
/// Extensions are matched case-insensitively (`"jpg"` matches `X.JPG`).
/// Subdirectories are not entered.
pub fn search(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::NotADirectory(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// An input file that could not be decoded.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: BackendError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    Written(PathBuf),
    Failed(String),
    Cancelled,
}

/// Progress messages streamed while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    UnitFinished {
        index: usize,
        file_name: String,
        steps: Vec<StepRecord>,
        status: UnitStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub index: usize,
    pub file_name: String,
    pub steps: Vec<StepRecord>,
    pub status: UnitStatus,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Written(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Failed(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Cancelled))
    }

    fn count(&self, pred: impl Fn(&UnitStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Outcome of matching the destination listing against the units.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub kept: Vec<String>,
    pub removed: Vec<String>,
    /// Stale files deleted from disk (only when pruning).
    pub pruned: usize,
    /// Stale files that could not be deleted, with the reason.
    pub prune_failures: Vec<(String, String)>,
}

/// Split a destination listing into entries that belong to a unit and
/// stale ones. Order of `listing` is preserved.
pub fn reconcile_listing(listing: &[String], unit_names: &[&str]) -> (Vec<String>, Vec<String>) {
    let wanted: HashSet<&str> = unit_names.iter().copied().collect();
    listing
        .iter()
        .cloned()
        .partition(|name| wanted.contains(name.as_str()))
}

pub struct Batch {
    pub input_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub extensions: Vec<String>,
    pub units: Vec<ApplyUnit>,
    pub load_failures: Vec<LoadFailure>,
    /// Tracked destination listing, by file name.
    pub outputs: Vec<String>,
}

impl Batch {
    /// Decode every matching file in `input_dir` into a unit.
    pub fn load(
        input_dir: &Path,
        destination_dir: &Path,
        extensions: &[String],
        backend: &impl ImageBackend,
    ) -> Result<Self, BatchError> {
        let mut batch = Self {
            input_dir: input_dir.to_path_buf(),
            destination_dir: destination_dir.to_path_buf(),
            extensions: extensions.to_vec(),
            units: Vec::new(),
            load_failures: Vec::new(),
            outputs: Vec::new(),
        };
        let sources = search(input_dir, extensions)?;
        batch.add_units(&sources, backend);
        log::info!(
            "loaded {} images from {} ({} failed)",
            batch.units.len(),
            input_dir.display(),
            batch.load_failures.len()
        );
        Ok(batch)
    }

    fn add_units(&mut self, sources: &[PathBuf], backend: &impl ImageBackend) {
        let destination = &self.destination_dir;
        let loaded: Vec<_> = sources
            .par_iter()
            .map(|path| {
                ApplyUnit::load(path, destination, backend).map_err(|error| LoadFailure {
                    path: path.clone(),
                    error,
                })
            })
            .collect();
        for result in loaded {
            match result {
                Ok(unit) => self.units.push(unit),
                Err(failure) => {
                    log::warn!("skipping {}: {}", failure.path.display(), failure.error);
                    self.load_failures.push(failure);
                }
            }
        }
        self.units.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    }

    /// Rescan the input directory: drop units whose file is gone and load
    /// files that appeared since the last scan.
    pub fn refresh_inputs(
        &mut self,
        backend: &impl ImageBackend,
    ) -> Result<RefreshSummary, BatchError> {
        let sources = search(&self.input_dir, &self.extensions)?;
        let present: HashSet<String> = sources.iter().map(|p| file_name_of(p)).collect();

        let mut summary = RefreshSummary::default();
        self.units.retain(|unit| {
            let keep = present.contains(&unit.file_name);
            if !keep {
                summary.removed.push(unit.file_name.clone());
            }
            keep
        });

        let known: HashSet<&str> = self.units.iter().map(|u| u.file_name.as_str()).collect();
        let new_sources: Vec<PathBuf> = sources
            .into_iter()
            .filter(|p| !known.contains(file_name_of(p).as_str()))
            .collect();

        self.load_failures.clear();
        let before: HashSet<String> = self.units.iter().map(|u| u.file_name.clone()).collect();
        self.add_units(&new_sources, backend);
        summary.added = self
            .units
            .iter()
            .filter(|u| !before.contains(&u.file_name))
            .map(|u| u.file_name.clone())
            .collect();

        log::info!(
            "refreshed inputs: {} added, {} removed",
            summary.added.len(),
            summary.removed.len()
        );
        Ok(summary)
    }

    /// Run `pipeline` on every unit and write the results.
    ///
    /// When `events` is given, a [`BatchEvent::Started`] is sent first and a
    /// [`BatchEvent::UnitFinished`] as each unit completes (in completion
    /// order). The returned report is in unit order.
    pub fn run(
        &mut self,
        pipeline: Arc<Pipeline>,
        backend: &impl ImageBackend,
        ctx: &OpContext<'_>,
        events: Option<Sender<BatchEvent>>,
    ) -> BatchReport {
        if let Some(tx) = &events {
            let _ = tx.send(BatchEvent::Started {
                total: self.units.len(),
            });
        }

        let outcomes: Vec<UnitOutcome> = self
            .units
            .par_iter_mut()
            .enumerate()
            .map(|(index, unit)| {
                unit.set_pipeline(pipeline.clone());
                let status = match unit.execute(backend, ctx) {
                    Ok(path) => UnitStatus::Written(path),
                    Err(ApplyError::Run(RunError::Cancelled { .. })) => UnitStatus::Cancelled,
                    Err(e) => {
                        log::error!("{}: {e}", unit.file_name);
                        UnitStatus::Failed(e.to_string())
                    }
                };
                let outcome = UnitOutcome {
                    index,
                    file_name: unit.file_name.clone(),
                    steps: unit.steps.clone(),
                    status,
                };
                if let Some(tx) = &events {
                    let _ = tx.send(BatchEvent::UnitFinished {
                        index: outcome.index,
                        file_name: outcome.file_name.clone(),
                        steps: outcome.steps.clone(),
                        status: outcome.status.clone(),
                    });
                }
                outcome
            })
            .collect();

        BatchReport { outcomes }
    }

    /// Match the destination listing against the units by file name.
    ///
    /// Entries without a unit are dropped from [`Batch::outputs`]. With
    /// `prune`, the stale files are also deleted from disk.
    pub fn reconcile(&mut self, prune: bool) -> Result<Reconciliation, BatchError> {
        let listing: Vec<String> = if self.destination_dir.is_dir() {
            search(&self.destination_dir, &self.extensions)?
                .iter()
                .map(|p| file_name_of(p))
                .collect()
        } else {
            Vec::new()
        };

        let names: Vec<&str> = self.units.iter().map(|u| u.file_name.as_str()).collect();
        let (kept, removed) = reconcile_listing(&listing, &names);

        self.outputs = kept.clone();
        let (pruned, prune_failures) = if prune {
            prune_files(&self.destination_dir, &removed)
        } else {
            for name in &removed {
                log::warn!("stale output {name} has no matching input");
            }
            (0, Vec::new())
        };

        Ok(Reconciliation {
            kept,
            removed,
            pruned,
            prune_failures,
        })
    }
}

/// Delete `names` from `dir`. A file that cannot be removed is reported and
/// the rest are still attempted.
fn prune_files(dir: &Path, names: &[String]) -> (usize, Vec<(String, String)>) {
    let mut pruned = 0;
    let mut failures = Vec::new();
    for name in names {
        match std::fs::remove_file(dir.join(name)) {
            Ok(()) => {
                pruned += 1;
                log::warn!("pruned stale output {name}");
            }
            Err(e) => {
                log::error!("could not prune {name}: {e}");
                failures.push((name.clone(), e.to_string()));
            }
        }
    }
    (pruned, failures)
}
