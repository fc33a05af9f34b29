//! Image processing for icon rasterization
//!
//! This module turns source bytes into correctly scaled, legible square
//! bitmaps, one per requested icon size.
//!
//! # Architecture
//!
//! - **magic**: Sniffs the source format from its leading bytes
//! - **decoder**: Decodes raster input with `image`, SVG with `resvg`
//! - **trim**: Finds the visible content box for the smallest sizes
//! - **resizer**: Letterbox geometry, single-step resampling, compositing
//! - **downscale**: Stepped halving and gamma-correct box reduction
//! - **tuning**: Size-banded sharpen/contrast table and coverage profiles
//! - **filters**: Quantize, dilate, sharpen and outline passes
//! - **encode**: Lossless PNG/WebP compression
//! - **render**: Orchestrates the steps above for one size
//! - **hint**: Thin/bold advisory from the finished small bitmaps
//!
//! # Pipeline
//!
//! 1. Decode the source once (SVG rasterized at >= 512 px on its long edge)
//! 2. Compute the trim rectangle once
//! 3. Per size: canvas, placement, stepped draw, filter chain, PNG
//!
//! # Supported Source Formats
//!
//! - PNG, JPEG, GIF (first frame), BMP, TIFF, ICO (largest entry), WebP
//! - SVG
//!
//! # Examples
//!
//! ```no_run
//! use icosmith::converter::limits::Deadline;
//! use icosmith::image_processor::{decoder, render, trim};
//! use icosmith::utils::budget::MemoryBudget;
//! use icosmith::RenderOptions;
//!
//! let bytes = std::fs::read("logo.png")?;
//! let budget = MemoryBudget::new(100 * 1024 * 1024);
//! let source = decoder::decode_source(&bytes, None, &Default::default(), &budget)?;
//! let rect = trim::compute_trim_rect(source.pixels());
//! let deadline = Deadline::start(std::time::Duration::from_secs(30));
//! let (bitmap, _) =
//!     render::render_size(&source, &rect, 32, &RenderOptions::default(), &budget, &deadline)?;
//! assert_eq!(bitmap.size(), 32);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod decoder;
pub mod downscale;
pub mod encode;
pub mod filters;
pub mod hint;
pub mod magic;
pub mod render;
pub mod resizer;
pub mod trim;
pub mod tuning;

use magic::SourceFormat;

/// MIME types the decoder accepts as a declared type
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/webp",
    "image/svg+xml",
];

/// Check if a declared MIME type names a decodable format
///
/// Case-insensitive; parameters such as `; charset=utf-8` are ignored.
///
/// # Examples
/// ```
/// use icosmith::image_processor::is_supported_mime;
///
/// assert!(is_supported_mime("image/png"));
/// assert!(is_supported_mime("IMAGE/SVG+XML; charset=utf-8"));
/// assert!(!is_supported_mime("application/pdf"));
/// ```
pub fn is_supported_mime(mime: &str) -> bool {
    SourceFormat::from_mime_type(mime).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_mime_is_supported() {
        for mime in SUPPORTED_MIME_TYPES {
            assert!(is_supported_mime(mime), "{} should be supported", mime);
        }
    }

    #[test]
    fn test_unsupported_mime() {
        assert!(!is_supported_mime("text/html"));
        assert!(!is_supported_mime(""));
        assert!(!is_supported_mime("image/avif"));
    }
}
