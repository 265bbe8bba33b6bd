use super::{Context, StepOutput, Transform, TransformError, write_output};
use crate::config::Category;
use crate::imaging::{ImageOptimizer, RustOptimizer, optimize_image, plan_optimize};
use crate::sources;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Re-encodes every matched image into the images destination.
///
/// Files the optimizer has no codec for are copied as-is. Decoding runs on
/// the blocking pool; reading and writing stay on the scheduler.
#[derive(Clone)]
pub struct ImagesTransform {
    optimizer: Arc<dyn ImageOptimizer>,
}

impl ImagesTransform {
    pub fn new() -> Self {
        Self::with_optimizer(Arc::new(RustOptimizer::new()))
    }

    /// Use a specific backend (allows testing with a mock).
    pub fn with_optimizer(optimizer: Arc<dyn ImageOptimizer>) -> Self {
        Self { optimizer }
    }

    async fn optimize_all(&self, ctx: &Context) -> Result<StepOutput, TransformError> {
        let entry = ctx.config().paths.get(Category::Images);
        let dest = ctx.resolve(&entry.dest);

        let mut written = Vec::new();
        let mut saved = 0usize;
        let mut reencoded = 0usize;
        for file in sources::expand(ctx.root(), &entry.src)? {
            let original = tokio::fs::read(&file.path)
                .await
                .map_err(TransformError::io(&file.path))?;

            let bytes = match plan_optimize(&file.path, &ctx.config().images) {
                Some(params) => {
                    let optimizer = Arc::clone(&self.optimizer);
                    let result = tokio::task::spawn_blocking(move || {
                        optimize_image(optimizer.as_ref(), original, &params)
                    })
                    .await?
                    .map_err(|source| TransformError::Image {
                        path: file.path.clone(),
                        source,
                    })?;
                    saved += result.saved();
                    reencoded += usize::from(result.reencoded);
                    result.bytes
                }
                None => original,
            };

            let target = file.target_in(&dest);
            write_output(&target, &bytes).await?;
            tracing::debug!("images: {} → {}", file.path.display(), target.display());
            written.push(target);
        }

        if !written.is_empty() {
            tracing::info!(
                "images: re-encoded {reencoded} of {} files, saved {saved} bytes",
                written.len()
            );
        }
        Ok(StepOutput { written })
    }
}

impl Default for ImagesTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for ImagesTransform {
    fn name(&self) -> &str {
        Category::Images.name()
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>> {
        Box::pin(self.optimize_all(ctx))
    }
}
