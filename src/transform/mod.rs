//! Leaf steps of the task graph.
//!
//! Every step implements [`Transform`]: run once against a [`Context`],
//! resolve with the files written or fail with a [`TransformError`]. The
//! concrete transforms only wire a source glob, one external capability, and
//! a destination together:
//!
//! | Transform | Capability |
//! |---|---|
//! | [`CopyTransform`] | byte copy, optional rename (pages, favicon, fonts, htaccess) |
//! | [`StylesTransform`] | `grass` Sass compile → `lightningcss` prefix + minify |
//! | [`ImagesTransform`] | [`ImageOptimizer`](crate::imaging::ImageOptimizer) re-encode |
//!
//! The clean step, the source watcher, and the dev server are transforms too
//! (see [`crate::clean`], [`crate::watch`], [`crate::server`]), so the task
//! graph treats every leaf the same way.

mod copy;
mod images;
mod styles;

pub use copy::CopyTransform;
pub use images::ImagesTransform;
pub use styles::StylesTransform;

use crate::config::PipelineConfig;
use crate::imaging::ImagingError;
use crate::server::ServerError;
use crate::sources::SourceError;
use crate::watch::WatchError;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("Sass compile failed for {}: {}", .path.display(), .message)]
    StyleCompile { path: PathBuf, message: String },
    #[error("CSS processing failed for {}: {}", .path.display(), .message)]
    StyleProcess { path: PathBuf, message: String },
    #[error("image optimization failed for {}: {}", .path.display(), .source)]
    Image {
        path: PathBuf,
        #[source]
        source: ImagingError,
    },
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TransformError {
    /// Build an error-mapping closure for IO on `path`.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> TransformError + '_ {
        move |source| TransformError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a completed step produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    /// Files written, as full paths.
    pub written: Vec<PathBuf>,
}

/// Immutable run context: the project root and its loaded configuration.
///
/// Cheap to clone; the config sits behind an `Arc` so spawned re-runs (watch
/// mode) can hold their own handle.
#[derive(Debug, Clone)]
pub struct Context {
    root: PathBuf,
    config: Arc<PipelineConfig>,
}

impl Context {
    pub fn new(root: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self {
            root: root.into(),
            config: Arc::new(config),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve a project-relative path.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Absolute output root.
    pub fn output_root(&self) -> PathBuf {
        self.resolve(&self.config.output)
    }
}

/// A leaf step: run once, report completion or failure.
///
/// `run` returns a boxed future so transforms can live behind
/// `Arc<dyn Transform>` in the task graph and be re-run by the watcher.
pub trait Transform: Send + Sync {
    /// Name used in logs, reports, and the registry.
    fn name(&self) -> &str;

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>>;
}

/// Write `bytes` to `target`, creating parent directories first.
pub(crate) async fn write_output(target: &Path, bytes: &[u8]) -> Result<(), TransformError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(TransformError::io(parent))?;
    }
    tokio::fs::write(target, bytes)
        .await
        .map_err(TransformError::io(target))
}
