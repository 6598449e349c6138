//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Pipeline
//!
//! ```text
//! Pipeline (2 steps)
//! 001 Resize (height: 50px, width: 0px)
//! 002 Flip (vertical: true, horizontal: false)
//! ```
//!
//! ## Run
//!
//! ```text
//! Processing 3 images
//!     001 a.jpg → data/output/a.jpg
//!     002 b.jpg failed
//!         Step 2 (Crop) failed: Degenerate crop: no edges detected
//!         Steps: Resize applied, Crop failed, Flip skipped
//!     003 c.jpg cancelled
//!
//! Written 1, failed 1, cancelled 1
//! ```
//!
//! ## List
//!
//! ```text
//! Inputs (data/input)
//! 001 a.jpg
//! 002 b.jpg
//!
//! Unreadable
//!     broken.png: Failed to decode ...
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport, LoadFailure, Reconciliation, UnitStatus};
use crate::pipeline::{Pipeline, StepRecord, StepStatus};
use std::path::Path;

/// Format a 0-based index as a 1-based, 3-digit zero-padded position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// One-line step log, e.g. `Steps: Flip applied, Crop failed, Resize skipped`.
fn step_log_line(steps: &[StepRecord]) -> Option<String> {
    if steps.is_empty() {
        return None;
    }
    let entries: Vec<String> = steps
        .iter()
        .map(|s| {
            let status = match s.status {
                StepStatus::Applied => "applied",
                StepStatus::Failed => "failed",
                StepStatus::Skipped => "skipped",
            };
            format!("{} {}", s.kind, status)
        })
        .collect();
    Some(format!("Steps: {}", entries.join(", ")))
}

// ============================================================================
// Pipeline
// ============================================================================

pub fn format_pipeline(pipeline: &Pipeline) -> Vec<String> {
    let mut lines = vec![format!("Pipeline ({})", plural(pipeline.len(), "step", "steps"))];
    for (i, op) in pipeline.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i), op));
    }
    lines
}

pub fn print_pipeline(pipeline: &Pipeline) {
    for line in format_pipeline(pipeline) {
        println!("{}", line);
    }
}

// ============================================================================
// Run progress
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            vec![format!("Processing {}", plural(*total, "image", "images"))]
        }
        BatchEvent::UnitFinished {
            index,
            file_name,
            steps,
            status,
        } => {
            let head = format!("{}{} {}", indent(1), format_index(*index), file_name);
            match status {
                UnitStatus::Written(path) => {
                    vec![format!("{head} \u{2192} {}", path.display())]
                }
                UnitStatus::Cancelled => vec![format!("{head} cancelled")],
                UnitStatus::Failed(reason) => {
                    let mut lines = vec![format!("{head} failed")];
                    lines.push(format!("{}{}", indent(2), reason));
                    if let Some(log) = step_log_line(steps) {
                        lines.push(format!("{}{}", indent(2), log));
                    }
                    lines
                }
            }
        }
    }
}

pub fn format_report_summary(report: &BatchReport) -> String {
    let mut summary = format!("Written {}, failed {}", report.written(), report.failed());
    if report.cancelled() > 0 {
        summary.push_str(&format!(", cancelled {}", report.cancelled()));
    }
    summary
}

pub fn format_reconciliation(result: &Reconciliation) -> Vec<String> {
    if result.removed.is_empty() {
        return Vec::new();
    }
    let verb = if result.pruned > 0 { "Pruned" } else { "Stale" };
    let mut lines = vec![format!(
        "{verb} outputs ({})",
        plural(result.removed.len(), "file", "files")
    )];
    for name in &result.removed {
        match result.prune_failures.iter().find(|(failed, _)| failed == name) {
            Some((_, reason)) => {
                lines.push(format!("{}{} (not removed: {})", indent(1), name, reason))
            }
            None => lines.push(format!("{}{}", indent(1), name)),
        }
    }
    lines
}

pub fn print_run_summary(report: &BatchReport, reconciliation: &Reconciliation) {
    println!();
    println!("{}", format_report_summary(report));
    for line in format_reconciliation(reconciliation) {
        println!("{}", line);
    }
}

// ============================================================================
// Input listing
// ============================================================================

pub fn format_listing(input_dir: &Path, files: &[String], failures: &[LoadFailure]) -> Vec<String> {
    let mut lines = vec![format!("Inputs ({})", input_dir.display())];
    if files.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, name) in files.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i), name));
    }
    if !failures.is_empty() {
        lines.push(String::new());
        lines.extend(format_load_failures(failures));
    }
    lines
}

/// Files that could not be read, one indented line each. Empty when none.
pub fn format_load_failures(failures: &[LoadFailure]) -> Vec<String> {
    if failures.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Unreadable".to_string()];
    for failure in failures {
        let name = failure
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| failure.path.display().to_string());
        lines.push(format!("{}{}: {}", indent(1), name, failure.error));
    }
    lines
}

pub fn print_listing(input_dir: &Path, files: &[String], failures: &[LoadFailure]) {
    for line in format_listing(input_dir, files, failures) {
        println!("{}", line);
    }
}
