//! Source watcher: re-run a category's transform when its sources change.
//!
//! Each [`WatchBinding`] pairs a category's source globs with the transform
//! that rebuilds it. The watcher observes the literal base directories of
//! all globs, debounces raw events, and for every batch spawns one fresh run
//! per binding with at least one matching path.
//!
//! Runs are fire-and-forget: a batch that arrives while the previous run of
//! the same transform is still going starts a second, overlapping run.
//! Failures are logged and the watcher keeps going.

use crate::config::Category;
use crate::sources::{GlobSet, SourceError};
use crate::transform::{Context, StepOutput, Transform, TransformError};
use futures::future::BoxFuture;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to start file watcher: {0}")]
    Init(#[source] notify::Error),
    #[error("cannot watch {}: {}", .path.display(), .source)]
    Path {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Source globs of one category and the transform that rebuilds it.
#[derive(Clone)]
pub struct WatchBinding {
    pub category: Category,
    pub globs: GlobSet,
    pub transform: Arc<dyn Transform>,
}

impl WatchBinding {
    pub fn new(
        category: Category,
        patterns: &[String],
        transform: Arc<dyn Transform>,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            category,
            globs: GlobSet::new(patterns)?,
            transform,
        })
    }
}

/// Long-running leaf that watches every binding until the process ends.
#[derive(Clone)]
pub struct WatchTransform {
    bindings: Vec<WatchBinding>,
}

impl WatchTransform {
    pub fn new(bindings: Vec<WatchBinding>) -> Self {
        Self { bindings }
    }

    /// Bindings with at least one glob matching a path in the batch.
    fn triggered<'a>(&'a self, paths: &'a [PathBuf]) -> impl Iterator<Item = &'a WatchBinding> {
        self.bindings
            .iter()
            .filter(|b| paths.iter().any(|p| b.globs.matches(p)))
    }

    /// Spawn one run per binding matched by any path in the batch.
    ///
    /// Paths are relative to the project root. Returns the spawned handles;
    /// the watch loop drops them, tests await them.
    pub fn dispatch(&self, ctx: &Context, paths: &[PathBuf]) -> Vec<JoinHandle<()>> {
        self.triggered(paths)
            .map(|binding| {
                let transform = Arc::clone(&binding.transform);
                let ctx = ctx.clone();
                tokio::spawn(async move { rerun(transform.as_ref(), &ctx).await })
            })
            .collect()
    }

    /// Existing directories to watch, with nested ones folded into their
    /// parents.
    fn watch_roots(&self, ctx: &Context) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .bindings
            .iter()
            .flat_map(|b| b.globs.base_dirs())
            .map(|dir| ctx.resolve(&dir))
            .collect();
        dirs.sort();
        dirs.dedup();

        let mut roots: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            if roots.iter().any(|r| dir.starts_with(r)) {
                continue;
            }
            if dir.is_dir() {
                roots.push(dir);
            } else {
                tracing::warn!("watch: {} does not exist, not watching it", dir.display());
            }
        }
        roots
    }

    async fn watch_sources(&self, ctx: &Context) -> Result<StepOutput, TransformError> {
        let roots = self.watch_roots(ctx);
        let debounce = Duration::from_millis(ctx.config().watch.debounce_ms);
        let (_debouncer, mut events) = watch_dirs(&roots, debounce)?;
        tracing::info!("watch: watching {} directories", roots.len());

        let prefixes = root_prefixes(ctx.root());
        while let Some(batch) = events.recv().await {
            match batch {
                Ok(batch) => {
                    let changed: Vec<PathBuf> = batch
                        .iter()
                        .filter_map(|event| strip_root(&prefixes, &event.path))
                        .collect();
                    for path in &changed {
                        tracing::debug!("watch: changed {}", path.display());
                    }
                    self.dispatch(ctx, &changed);
                }
                Err(e) => tracing::warn!("watch: {e}"),
            }
        }
        Ok(StepOutput::default())
    }
}

impl Transform for WatchTransform {
    fn name(&self) -> &str {
        "watch"
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>> {
        Box::pin(self.watch_sources(ctx))
    }
}

async fn rerun(transform: &dyn Transform, ctx: &Context) {
    let name = transform.name();
    let start = Instant::now();
    match transform.run(ctx).await {
        Ok(out) => tracing::info!(
            "{name}: rebuilt {} files in {:?}",
            out.written.len(),
            start.elapsed()
        ),
        Err(e) => tracing::error!("{name}: {e}"),
    }
}

/// Start a debounced recursive watcher on `dirs`.
///
/// Batches are forwarded into a tokio channel. The returned debouncer must be
/// kept alive for as long as events are wanted.
pub fn watch_dirs(
    dirs: &[PathBuf],
    debounce: Duration,
) -> Result<
    (
        Debouncer<RecommendedWatcher>,
        UnboundedReceiver<DebounceEventResult>,
    ),
    WatchError,
> {
    let (tx, rx) = unbounded_channel();
    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
        // receiver gone means the watching task ended
        let _ = tx.send(result);
    })
    .map_err(WatchError::Init)?;

    for dir in dirs {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Path {
                path: dir.clone(),
                source,
            })?;
    }
    Ok((debouncer, rx))
}

/// The root as given plus its canonical form; notify may report either.
pub(crate) fn root_prefixes(root: &Path) -> Vec<PathBuf> {
    let mut prefixes = vec![root.to_path_buf()];
    if let Ok(canonical) = root.canonicalize()
        && canonical != root
    {
        prefixes.push(canonical);
    }
    prefixes
}

pub(crate) fn strip_root(prefixes: &[PathBuf], path: &Path) -> Option<PathBuf> {
    prefixes
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix).ok())
        .map(Path::to_path_buf)
}
