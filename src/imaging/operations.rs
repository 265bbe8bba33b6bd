//! High-level image operations.
//!
//! These combine config with a backend call and apply the "never grow"
//! rule: a re-encode that is not strictly smaller is thrown away and the
//! original bytes are kept.

use super::backend::{ImageOptimizer, ImagingError};
use super::params::{ImageKind, OptimizeParams, Quality};
use crate::config::ImagesConfig;
use std::path::Path;

/// Result of optimizing one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimized {
    pub bytes: Vec<u8>,
    /// True when the re-encoded bytes were kept.
    pub reencoded: bool,
    pub original_len: usize,
}

impl Optimized {
    pub fn saved(&self) -> usize {
        self.original_len - self.bytes.len()
    }
}

/// Plan the optimization for a file, or `None` if its format is unsupported.
pub fn plan_optimize(path: &Path, config: &ImagesConfig) -> Option<OptimizeParams> {
    let kind = ImageKind::from_path(path)?;
    Some(OptimizeParams {
        kind,
        quality: Quality::new(config.jpeg_quality),
    })
}

/// Re-encode `original` and keep whichever encoding is smaller.
pub fn optimize_image(
    backend: &dyn ImageOptimizer,
    original: Vec<u8>,
    params: &OptimizeParams,
) -> Result<Optimized, ImagingError> {
    let original_len = original.len();
    let candidate = backend.optimize(&original, params)?;
    if candidate.len() < original_len {
        Ok(Optimized {
            bytes: candidate,
            reencoded: true,
            original_len,
        })
    } else {
        Ok(Optimized {
            bytes: original,
            reencoded: false,
            original_len,
        })
    }
}
