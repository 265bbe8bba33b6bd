//! Parameter types for image optimization.
//!
//! These describe *what* to do, not *how*. [`operations`](super::operations)
//! builds them from config and file names; the
//! [`backend`](super::backend) does the pixel work.

use std::path::Path;

/// Lossy encoding quality (1-100), clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Formats the optimizer knows how to re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    /// Detect from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }
}

/// Everything the backend needs to optimize one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeParams {
    pub kind: ImageKind,
    /// Only consulted for JPEG.
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(ImageKind::from_path(Path::new("a/b.png")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("b.JPG")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("b.jpeg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("anim.gif")), Some(ImageKind::Gif));
        assert_eq!(ImageKind::from_path(Path::new("icon.svg")), None);
        assert_eq!(ImageKind::from_path(Path::new("README")), None);
    }
}
