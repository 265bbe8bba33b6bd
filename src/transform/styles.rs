//! Stylesheet step: Sass → CSS → prefixed, minified CSS.
//!
//! Every matched `.scss` file whose name does not start with `_` is an entry
//! point. Partials are only pulled in through `@use`/`@import`. Each entry
//! goes through two external libraries:
//!
//! 1. `grass` compiles Sass to plain CSS. Load paths are the entry's own
//!    directory plus `styles.include_paths`.
//! 2. `lightningcss` parses the CSS, adds vendor prefixes for the configured
//!    browserslist targets, and prints it (minified by default).
//!
//! `src/styles/main.scss` becomes `build/assets/styles/main.min.css`.

use super::{Context, StepOutput, Transform, TransformError, write_output};
use crate::config::{Category, ConfigError, StylesConfig};
use crate::sources::{self, SourceFile};
use futures::future::BoxFuture;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::{Path, PathBuf};

/// Compiles Sass entry points into CSS.
#[derive(Debug, Clone)]
pub struct StylesTransform {
    targets: Targets,
}

impl StylesTransform {
    /// Resolve browserslist queries up front so a bad query is a startup
    /// error, not a failure on first build.
    pub fn from_config(config: &StylesConfig) -> Result<Self, ConfigError> {
        let browsers = if config.browsers.is_empty() {
            None
        } else {
            Browsers::from_browserslist(config.browsers.iter().map(String::as_str)).map_err(
                |e| ConfigError::Validation(format!("styles.browsers: {e}")),
            )?
        };
        Ok(Self {
            targets: Targets::from(browsers),
        })
    }

    async fn compile_all(&self, ctx: &Context) -> Result<StepOutput, TransformError> {
        let styles = &ctx.config().styles;
        let entry = ctx.config().paths.get(Category::Styles);
        let dest = ctx.resolve(&entry.dest);
        let include_paths: Vec<PathBuf> = styles
            .include_paths
            .iter()
            .map(|p| ctx.resolve(p))
            .collect();

        let mut written = Vec::new();
        for file in sources::expand(ctx.root(), &entry.src)?
            .into_iter()
            .filter(is_entry_point)
        {
            let target = output_path(&file, &dest, &styles.suffix);
            let job = CompileJob {
                source: file.path.clone(),
                include_paths: include_paths.clone(),
                targets: self.targets,
                minify: styles.minify,
            };
            let css = tokio::task::spawn_blocking(move || job.run()).await??;
            write_output(&target, css.as_bytes()).await?;
            tracing::debug!("styles: {} → {}", file.path.display(), target.display());
            written.push(target);
        }
        Ok(StepOutput { written })
    }
}

impl Transform for StylesTransform {
    fn name(&self) -> &str {
        Category::Styles.name()
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>> {
        Box::pin(self.compile_all(ctx))
    }
}

/// Sass partials (`_name.scss`) are never emitted on their own.
fn is_entry_point(file: &SourceFile) -> bool {
    file.path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('_'))
}

/// `dir/main.scss` → `<dest>/dir/main<suffix>.css`.
fn output_path(file: &SourceFile, dest: &Path, suffix: &str) -> PathBuf {
    let stem = file
        .relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    file.target_in(dest)
        .with_file_name(format!("{stem}{suffix}.css"))
}

/// Owned inputs for one compile, so it can move onto the blocking pool.
struct CompileJob {
    source: PathBuf,
    include_paths: Vec<PathBuf>,
    targets: Targets,
    minify: bool,
}

impl CompileJob {
    fn run(self) -> Result<String, TransformError> {
        let css = compile_sass(&self.source, &self.include_paths)?;
        postprocess_css(&self.source, &css, self.targets, self.minify)
    }
}

fn compile_sass(source: &Path, include_paths: &[PathBuf]) -> Result<String, TransformError> {
    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    if let Some(dir) = source.parent() {
        options = options.load_path(dir);
    }
    options = options.load_paths(include_paths);
    grass::from_path(source, &options).map_err(|e| TransformError::StyleCompile {
        path: source.to_path_buf(),
        message: e.to_string(),
    })
}

fn postprocess_css(
    source: &Path,
    css: &str,
    targets: Targets,
    minify: bool,
) -> Result<String, TransformError> {
    let process_err = |message: String| TransformError::StyleProcess {
        path: source.to_path_buf(),
        message,
    };

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: source.display().to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| process_err(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| process_err(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| process_err(e.to_string()))?;
    Ok(printed.code)
}
