//! Clean step: recursively remove the output root.
//!
//! Config validation guarantees the output root is a strict subdirectory of
//! the project root, so this never deletes the project itself.

use crate::transform::{Context, StepOutput, Transform, TransformError};
use futures::future::BoxFuture;
use std::io::ErrorKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanTransform;

impl CleanTransform {
    async fn remove_output(&self, ctx: &Context) -> Result<StepOutput, TransformError> {
        let output = ctx.output_root();
        match tokio::fs::remove_dir_all(&output).await {
            Ok(()) => tracing::info!("clean: removed {}", output.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("clean: {} already absent", output.display());
            }
            Err(e) => return Err(TransformError::io(&output)(e)),
        }
        Ok(StepOutput::default())
    }
}

impl Transform for CleanTransform {
    fn name(&self) -> &str {
        "clean"
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>> {
        Box::pin(self.remove_output(ctx))
    }
}
