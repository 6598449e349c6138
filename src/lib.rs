//! # Retouch
//!
//! Batch image editing. A pipeline of operations (resize, flip, rotate, crop,
//! masking, background removal) is built once and applied to every image in
//! an input directory; each result is written under the same file name to an
//! output directory.
//!
//! # Architecture
//!
//! ```text
//! descriptors ──Pipeline::from_descriptors──► Pipeline (validated, immutable)
//!                                                │
//! input/*.jpg ──Batch::load──► ApplyUnit × N ◄───┘
//!                                 │ run (parallel across units,
//!                                 │      sequential within a unit)
//!                                 ▼
//!                            output/*.jpg ──Batch::reconcile──► tracked listing
//! ```
//!
//! The engine takes descriptors and images in and hands images and status
//! out. It never reaches back into caller state.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`operations`] | The closed operation set: parameters, validation, pixel work |
//! | [`pipeline`] | Descriptor parsing, ordered application, step log, cancellation |
//! | [`apply`] | One image bound to a pipeline and destination; execute and write |
//! | [`batch`] | Directory listing, parallel runs, progress events, reconciliation |
//! | [`imaging`] | Codec backend, raster layouts, geometry primitives, background removal |
//! | [`config`] | `retouch.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Closed Operation Set
//!
//! Operations are variants of one enum rather than trait objects. Adding an
//! operation means touching the registry, the descriptor parser and the
//! formatter, and the compiler points at each place. Descriptor names and
//! parameters are checked when the pipeline is built, so a typo fails before
//! the first image is decoded.
//!
//! ## Degenerate Results Are Errors
//!
//! A crop that would produce an empty image, or an auto-crop that finds no
//! edges, fails that unit with a typed error. The batch carries on.
//!
//! ## Rounding
//!
//! Every pixel computation that rounds (target sizes, crop corners) rounds
//! half to even, so `0.5 * 101` and `0.5 * 103` land on 50 and 52.
//!
//! ## Background Removal Is a Collaborator
//!
//! Segmentation models live outside the process. [`imaging::BackgroundRemover`]
//! is the seam; the default [`imaging::RembgCommand`] drives the `rembg`
//! command line. Concurrent calls are capped by [`imaging::ModelGate`] because
//! each call is slow and memory hungry.

pub mod apply;
pub mod batch;
pub mod config;
pub mod imaging;
pub mod operations;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
