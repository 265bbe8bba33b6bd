//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `pipeline.toml`. Stock defaults
//! reproduce the classic `src/` → `build/` layout; a user file only needs the
//! keys it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! project/
//! ├── pipeline.toml        # Optional, overrides stock defaults
//! ├── src/                 # Sources (pages, styles, img, fonts, ht.access)
//! └── build/               # Output root (deleted by `build`)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output = "build"          # Output root, relative to the project root
//!
//! [paths.pages]
//! src = ["src/pages/**/*.html"]
//! dest = "build"
//!
//! [paths.styles]
//! src = ["src/styles/**/*.scss"]
//! dest = "build/assets/styles"
//!
//! [paths.images]
//! src = ["src/img/**/*.jpg", "src/img/**/*.jpeg", "src/img/**/*.png", "src/img/**/*.gif"]
//! dest = "build/assets/img"
//!
//! [paths.favicon]
//! src = ["src/img/favicon/*.*"]
//! dest = "build"
//!
//! [paths.fonts]
//! src = ["src/fonts/**/*.*"]
//! dest = "build/assets/fonts"
//!
//! [paths.htaccess]
//! src = ["src/ht.access"]
//! dest = "build"
//!
//! [styles]
//! include_paths = []        # Extra Sass load paths
//! browsers = ["last 2 versions"]
//! minify = true
//! suffix = ".min"           # main.scss → main.min.css
//!
//! [images]
//! jpeg_quality = 85         # JPEG re-encode quality (1-100)
//!
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [watch]
//! debounce_ms = 100
//! ```
//!
//! Unknown keys are rejected to catch typos early. Every destination must
//! live under the output root, and no source glob may reach into it (or
//! contain it, since `build` deletes the output root first); anything else is
//! refused at load time.

use crate::sources::glob_base;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// File name looked up in the project root when no `--config` is given.
pub const CONFIG_FILENAME: &str = "pipeline.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Asset category. Each one owns exactly one path-table entry and one
/// transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Pages,
    Styles,
    Images,
    Favicon,
    Fonts,
    Htaccess,
}

impl Category {
    /// All categories, in the order the asset pass lists them.
    pub const ALL: [Category; 6] = [
        Category::Pages,
        Category::Styles,
        Category::Images,
        Category::Favicon,
        Category::Fonts,
        Category::Htaccess,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Pages => "pages",
            Category::Styles => "styles",
            Category::Images => "images",
            Category::Favicon => "favicon",
            Category::Fonts => "fonts",
            Category::Htaccess => "htaccess",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the path table: where a category reads from and writes to.
///
/// Globs and destination are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathEntry {
    pub src: Vec<String>,
    pub dest: PathBuf,
}

impl PathEntry {
    fn new(src: &[&str], dest: &str) -> Self {
        Self {
            src: src.iter().map(|s| s.to_string()).collect(),
            dest: PathBuf::from(dest),
        }
    }
}

/// Static mapping from category to source globs and destination directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathTable {
    pub pages: PathEntry,
    pub styles: PathEntry,
    pub images: PathEntry,
    pub favicon: PathEntry,
    pub fonts: PathEntry,
    pub htaccess: PathEntry,
}

impl Default for PathTable {
    fn default() -> Self {
        Self {
            pages: PathEntry::new(&["src/pages/**/*.html"], "build"),
            styles: PathEntry::new(&["src/styles/**/*.scss"], "build/assets/styles"),
            images: PathEntry::new(
                &[
                    "src/img/**/*.jpg",
                    "src/img/**/*.jpeg",
                    "src/img/**/*.png",
                    "src/img/**/*.gif",
                ],
                "build/assets/img",
            ),
            favicon: PathEntry::new(&["src/img/favicon/*.*"], "build"),
            fonts: PathEntry::new(&["src/fonts/**/*.*"], "build/assets/fonts"),
            htaccess: PathEntry::new(&["src/ht.access"], "build"),
        }
    }
}

impl PathTable {
    /// Look up the entry for a category.
    pub fn get(&self, category: Category) -> &PathEntry {
        match category {
            Category::Pages => &self.pages,
            Category::Styles => &self.styles,
            Category::Images => &self.images,
            Category::Favicon => &self.favicon,
            Category::Fonts => &self.fonts,
            Category::Htaccess => &self.htaccess,
        }
    }
}

/// Stylesheet compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    /// Extra Sass load paths, relative to the project root.
    pub include_paths: Vec<PathBuf>,
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,
    /// Minify the emitted CSS.
    pub minify: bool,
    /// Inserted between the entry stem and `.css`.
    pub suffix: String,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            browsers: vec!["last 2 versions".to_string()],
            minify: true,
            suffix: ".min".to_string(),
        }
    }
}

/// Image optimization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG re-encode quality (1 = worst, 100 = best).
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

/// Dev-server bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Filesystem watch settings, shared by the source watcher and the server's
/// output watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

/// Pipeline configuration loaded from `pipeline.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Output root, relative to the project root.
    pub output: PathBuf,
    pub paths: PathTable,
    pub styles: StylesConfig,
    pub images: ImagesConfig,
    pub server: ServerConfig,
    pub watch: WatchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("build"),
            paths: PathTable::default(),
            styles: StylesConfig::default(),
            images: ImagesConfig::default(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values and the output-root invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let output = normalize_relative(&self.output)
            .map_err(|reason| ConfigError::Validation(format!("output {reason}")))?;
        if output.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output must not be the project root".into(),
            ));
        }

        for category in Category::ALL {
            let entry = self.paths.get(category);
            if entry.src.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "paths.{category}.src must not be empty"
                )));
            }
            let dest = normalize_relative(&entry.dest).map_err(|reason| {
                ConfigError::Validation(format!("paths.{category}.dest {reason}"))
            })?;
            if !dest.starts_with(&output) {
                return Err(ConfigError::Validation(format!(
                    "paths.{category}.dest ({}) must be inside the output root ({})",
                    entry.dest.display(),
                    self.output.display()
                )));
            }
            for pattern in &entry.src {
                let base = normalize_relative(&glob_base(pattern)).map_err(|reason| {
                    ConfigError::Validation(format!("paths.{category}.src ({pattern}) {reason}"))
                })?;
                if base.starts_with(&output) || output.starts_with(&base) {
                    return Err(ConfigError::Validation(format!(
                        "paths.{category}.src ({pattern}) overlaps the output root ({})",
                        self.output.display()
                    )));
                }
            }
        }

        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// Strip `.` components and reject anything that could escape the project
/// root (absolute paths, `..`).
fn normalize_relative(path: &Path) -> Result<PathBuf, &'static str> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err("must not contain '..'"),
            Component::RootDir | Component::Prefix(_) => return Err("must be relative"),
        }
    }
    Ok(normalized)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the pipeline config for a project.
///
/// With `explicit` set, that file must exist. Otherwise `pipeline.toml` in
/// the project root is used when present, stock defaults when not.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(&root.join(CONFIG_FILENAME))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `pipeline.toml`.
///
/// Used by the `gen-config` subcommand.
pub fn stock_config_toml() -> &'static str {
    r##"# Asset Pipeline Configuration
# ============================
# All settings are optional. Values shown are the defaults.
# Paths are relative to the project root. Unknown keys are an error.

# Output root. `build` deletes it before writing; every dest below must
# live inside it.
output = "build"

# ---------------------------------------------------------------------------
# Path table: source globs -> destination directory, one per category.
# Directory structure below the glob's literal prefix is mirrored.
# ---------------------------------------------------------------------------
[paths.pages]
src = ["src/pages/**/*.html"]
dest = "build"

[paths.styles]
# Files starting with `_` are partials: watched, imported, never emitted.
src = ["src/styles/**/*.scss"]
dest = "build/assets/styles"

[paths.images]
src = ["src/img/**/*.jpg", "src/img/**/*.jpeg", "src/img/**/*.png", "src/img/**/*.gif"]
dest = "build/assets/img"

[paths.favicon]
src = ["src/img/favicon/*.*"]
dest = "build"

[paths.fonts]
src = ["src/fonts/**/*.*"]
dest = "build/assets/fonts"

[paths.htaccess]
# Written as `.htaccess`.
src = ["src/ht.access"]
dest = "build"

# ---------------------------------------------------------------------------
# Stylesheets
# ---------------------------------------------------------------------------
[styles]
# Extra Sass load paths (the entry's own directory is always searched).
include_paths = []

# Browserslist queries for vendor prefixing.
browsers = ["last 2 versions"]

minify = true

# main.scss -> main.min.css
suffix = ".min"

# ---------------------------------------------------------------------------
# Images (PNG and GIF are re-encoded losslessly; output never grows)
# ---------------------------------------------------------------------------
[images]
jpeg_quality = 85

# ---------------------------------------------------------------------------
# Dev server
# ---------------------------------------------------------------------------
[server]
host = "127.0.0.1"
port = 3000

# ---------------------------------------------------------------------------
# File watching
# ---------------------------------------------------------------------------
[watch]
debounce_ms = 100
"##
}
