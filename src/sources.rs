//! Source glob expansion and matching.
//!
//! Globs in the path table are relative to the project root. Expansion works
//! like a classic stream-based build tool: the *glob base* (the literal prefix
//! before the first wildcard component) is cut off each match, and the
//! remainder is mirrored under the destination directory.
//!
//! ```text
//! glob    src/pages/**/*.html
//! base    src/pages
//! match   src/pages/blog/post.html  →  relative  blog/post.html
//! ```
//!
//! A glob without wildcards names a single file; its base is the parent
//! directory, so only the file name is kept.

use glob::{MatchOptions, Pattern, PatternError};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("invalid glob '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },
    #[error("cannot read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `*` and `?` never cross a `/`; only `**` spans directories.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file matched by a source glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path on disk.
    pub path: PathBuf,
    /// Path below the glob base; mirrored under the destination.
    pub relative: PathBuf,
}

impl SourceFile {
    /// Where this file lands inside `dest`.
    pub fn target_in(&self, dest: &Path) -> PathBuf {
        dest.join(&self.relative)
    }
}

fn has_wildcard(part: &str) -> bool {
    part.contains(['*', '?', '['])
}

/// The literal directory prefix of a glob.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let mut saw_wildcard = false;
    for component in path.components() {
        if let Component::Normal(part) = component
            && has_wildcard(&part.to_string_lossy())
        {
            saw_wildcard = true;
            break;
        }
        base.push(component);
    }
    if !saw_wildcard {
        base.pop();
    }
    base
}

/// Expand globs against the project root.
///
/// Only regular files are returned, sorted by path, each at most once even
/// when several globs match it. A glob that matches nothing is not an error.
pub fn expand(root: &Path, patterns: &[String]) -> Result<Vec<SourceFile>, SourceError> {
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let mut found = BTreeMap::new();

    for pattern in patterns {
        let base = root.join(glob_base(pattern));
        let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
        let entries = glob::glob_with(&full, MATCH_OPTIONS).map_err(|source| {
            SourceError::Pattern {
                pattern: pattern.clone(),
                source,
            }
        })?;

        for entry in entries {
            let path = entry.map_err(|e| SourceError::Read {
                path: e.path().to_path_buf(),
                source: std::io::Error::from(e),
            })?;
            if !path.is_file() {
                continue;
            }
            let relative = match path.strip_prefix(&base) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
            };
            found.entry(path.clone()).or_insert(SourceFile { path, relative });
        }
    }

    Ok(found.into_values().collect())
}

/// Compiled globs for matching paths reported by the watcher.
#[derive(Debug, Clone)]
pub struct GlobSet {
    patterns: Vec<Pattern>,
}

impl GlobSet {
    pub fn new(patterns: &[String]) -> Result<Self, SourceError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| SourceError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Does a path relative to the project root match any of the globs?
    pub fn matches(&self, relative: &Path) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
    }

    /// Literal directories worth watching for these globs.
    pub fn base_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .patterns
            .iter()
            .map(|p| glob_base(p.as_str()))
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }
}
