//! Image optimization backend trait and shared error type.
//!
//! The [`ImageOptimizer`] trait takes encoded bytes in and gives re-encoded
//! bytes back. It never touches the filesystem, so the images transform owns
//! all IO and tests can swap in a recording mock.
//!
//! The production implementation is
//! [`RustOptimizer`](super::rust_backend::RustOptimizer).

use super::params::OptimizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Trait for image optimization backends.
///
/// `Send + Sync` so one instance can be shared by the task graph and handed
/// to blocking worker tasks.
pub trait ImageOptimizer: Send + Sync {
    /// Re-encode `bytes` according to `params`.
    fn optimize(&self, bytes: &[u8], params: &OptimizeParams) -> Result<Vec<u8>, ImagingError>;
}
