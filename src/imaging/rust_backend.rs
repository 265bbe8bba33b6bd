//! Pure Rust optimization backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Format | Decode | Encode |
//! |---|---|---|
//! | PNG | `image` PNG decoder | `PngEncoder`, `CompressionType::Best`, adaptive filtering |
//! | JPEG | `image` JPEG decoder | `JpegEncoder` at the configured quality |
//! | GIF | `GifDecoder` frames | `GifEncoder` frame by frame, infinite repeat if animated |
//!
//! All encoders are deterministic: the same input always yields the same
//! bytes, which keeps reruns of the images step byte-identical.

use super::backend::{ImageOptimizer, ImagingError};
use super::params::{ImageKind, OptimizeParams, Quality};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustOptimizer;

impl RustOptimizer {
    pub fn new() -> Self {
        Self
    }
}

fn decode_err(e: image::ImageError) -> ImagingError {
    ImagingError::Decode(e.to_string())
}

fn encode_err(e: image::ImageError) -> ImagingError {
    ImagingError::Encode(e.to_string())
}

fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, ImagingError> {
    image::load_from_memory_with_format(bytes, format).map_err(decode_err)
}

fn optimize_png(bytes: &[u8]) -> Result<Vec<u8>, ImagingError> {
    let img = decode(bytes, ImageFormat::Png)?;
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).map_err(encode_err)?;
    Ok(out)
}

fn optimize_jpeg(bytes: &[u8], quality: Quality) -> Result<Vec<u8>, ImagingError> {
    let img = decode(bytes, ImageFormat::Jpeg)?;
    // JPEG has no alpha channel
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.value());
    img.write_with_encoder(encoder).map_err(encode_err)?;
    Ok(out)
}

fn optimize_gif(bytes: &[u8]) -> Result<Vec<u8>, ImagingError> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(decode_err)?;
    let frames = decoder.into_frames().collect_frames().map_err(decode_err)?;
    let animated = frames.len() > 1;

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        if animated {
            encoder.set_repeat(Repeat::Infinite).map_err(encode_err)?;
        }
        encoder.encode_frames(frames).map_err(encode_err)?;
    }
    Ok(out)
}

impl ImageOptimizer for RustOptimizer {
    fn optimize(&self, bytes: &[u8], params: &OptimizeParams) -> Result<Vec<u8>, ImagingError> {
        match params.kind {
            ImageKind::Png => optimize_png(bytes),
            ImageKind::Jpeg => optimize_jpeg(bytes, params.quality),
            ImageKind::Gif => optimize_gif(bytes),
        }
    }
}
