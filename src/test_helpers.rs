//! Shared test utilities for the asset-pipeline test suite.
//!
//! Provides filesystem fixture builders and a recording mock transform for
//! exercising the task graph and watcher without real codecs.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "src/pages/index.html", "<html></html>");
//! let ctx = test_context(tmp.path());
//!
//! let log = CallLog::default();
//! let task = Task::leaf(Arc::new(MockTransform::failing("styles", &log)));
//! let report = task.run(&ctx).await;
//! assert_eq!(log.calls(), vec!["styles"]);
//! ```

use crate::config::PipelineConfig;
use crate::transform::{Context, StepOutput, Transform, TransformError, write_output};
use futures::future::BoxFuture;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

/// Encode a small gradient as PNG with the `image` crate's default settings.
///
/// The default encoder leaves room for the best-compression re-encode, so
/// optimized output is normally smaller than the fixture.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7) as u8, (y * 5) as u8, 90])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn write_png(root: &Path, rel: &str, width: u32, height: u32) -> PathBuf {
    write_file(root, rel, png_bytes(width, height))
}

/// A context over `root` with stock config.
pub fn test_context(root: &Path) -> Context {
    Context::new(root, PipelineConfig::default())
}

/// Every file under `dir` as a sorted list of `/`-separated relative paths.
/// Empty when `dir` does not exist.
pub fn list_files(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

// =========================================================================
// Recording mock transform
// =========================================================================

/// Shared record of which mock transforms ran.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    started: Arc<Mutex<Vec<String>>>,
    finished: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Names of mocks in the order they started.
    pub fn calls(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Names of mocks in the order they completed.
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

/// Transform that records its runs and succeeds or fails on demand.
pub struct MockTransform {
    name: String,
    log: CallLog,
    fail: bool,
    delay: Option<Duration>,
    writes: Option<PathBuf>,
}

impl MockTransform {
    pub fn succeeding(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            fail: false,
            delay: None,
            writes: None,
        }
    }

    pub fn failing(name: &str, log: &CallLog) -> Self {
        Self {
            fail: true,
            ..Self::succeeding(name, log)
        }
    }

    /// Sleep before completing.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Write a file (relative to the project root) when it succeeds.
    pub fn writing(mut self, rel: &str) -> Self {
        self.writes = Some(PathBuf::from(rel));
        self
    }

    async fn execute(&self, ctx: &Context) -> Result<StepOutput, TransformError> {
        self.log.started.lock().unwrap().push(self.name.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = if self.fail {
            Err(TransformError::StyleCompile {
                path: PathBuf::from(&self.name),
                message: "mock failure".into(),
            })
        } else {
            let mut written = Vec::new();
            if let Some(rel) = &self.writes {
                let target = ctx.resolve(rel);
                write_output(&target, self.name.as_bytes()).await?;
                written.push(target);
            }
            Ok(StepOutput { written })
        };
        self.log.finished.lock().unwrap().push(self.name.clone());
        result
    }
}

impl Transform for MockTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>> {
        Box::pin(self.execute(ctx))
    }
}
