//! Image primitives: codec, raster layouts, geometry and background removal.
//!
//! | Concern | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` crate ([`RustBackend`]) |
//! | **Resize / flip / sub-image** | `image::DynamicImage` methods |
//! | **Rotate about a pivot** | `imageproc::geometric_transformations::rotate` |
//! | **Edge detection** | `imageproc::edges::canny` |
//! | **Background removal** | external `rembg` command ([`RembgCommand`]) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and statistics math (unit testable)
//! - **Raster**: The supported pixel layouts and load-time normalization
//! - **Geometry**: Pixel primitives combining calculations with buffer work
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Background**: [`BackgroundRemover`] trait, [`RembgCommand`], [`ModelGate`]

pub mod background;
pub mod backend;
pub mod calculations;
pub mod geometry;
pub mod raster;
pub mod rust_backend;

pub use background::{BackgroundRemover, ModelGate, NoRemover, RembgCommand};
pub use backend::{BackendError, Dimensions, ImageBackend};
pub use rust_backend::{RustBackend, supported_extensions};
