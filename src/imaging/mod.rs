//! Image optimization in pure Rust, no external tools.
//!
//! | Format | Treatment |
//! |---|---|
//! | **PNG** | lossless re-encode, best compression, adaptive filters |
//! | **JPEG** | re-encode at `images.jpeg_quality` |
//! | **GIF** | re-encode all frames |
//!
//! Output never grows: when a re-encode is not smaller, the original bytes
//! are written instead.
//!
//! The module is split into:
//! - **Parameters**: what to do with a file ([`OptimizeParams`])
//! - **Backend**: [`ImageOptimizer`] trait + [`RustOptimizer`]
//! - **Operations**: planning from config and the keep-smaller rule

pub mod backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ImageOptimizer, ImagingError};
pub use operations::{Optimized, optimize_image, plan_optimize};
pub use params::{ImageKind, OptimizeParams, Quality};
pub use rust_backend::RustOptimizer;
