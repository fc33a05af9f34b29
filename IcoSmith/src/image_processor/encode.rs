//! Bitmap compression
//!
//! Icon bitmaps are always stored losslessly. Encoder settings are fixed so
//! identical pixels always produce identical bytes.

use crate::utils::error::{IcoError, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

/// Compress `img` to a PNG stream.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| {
            IcoError::Encoding(format!(
                "PNG compression failed for {}x{}: {}",
                img.width(),
                img.height(),
                e
            ))
        })?;
    Ok(out)
}

/// Compress `img` to a lossless WebP stream.
pub fn encode_webp_lossless(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    WebPEncoder::new_lossless(&mut out)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| {
            IcoError::Encoding(format!(
                "WebP compression failed for {}x{}: {}",
                img.width(),
                img.height(),
                e
            ))
        })?;
    Ok(out)
}
