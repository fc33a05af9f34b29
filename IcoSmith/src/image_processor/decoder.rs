//! Source decoding from raw bytes
//!
//! Uses a two-path strategy:
//! 1. SVG input (sniffed by content, or declared `image/svg+xml` when the
//!    bytes match no raster signature) is rasterized with `resvg`
//! 2. Everything else goes through the `image` crate decoders
//!
//! Both paths check the source dimensions against [`DecodeLimits`] and
//! reserve the decoded buffer against the conversion's [`MemoryBudget`]
//! *before* the full-size pixel buffer is allocated. The result is always
//! straight (non-premultiplied) RGBA8.

use super::magic::{self, SourceFormat};
use crate::utils::budget::MemoryBudget;
use crate::utils::error::{IcoError, LimitKind, Result};
use image::{ImageReader, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;

/// Longest edge an SVG is rasterized at when its intrinsic size is smaller.
pub const SVG_MIN_RASTER_EDGE: u32 = 512;

/// Ceilings applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum accepted input length in bytes
    pub max_input_bytes: u64,
    /// Maximum decoded width or height in pixels
    pub max_dimension: u32,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 50 * 1024 * 1024,
            max_dimension: 4096,
        }
    }
}

/// A decoded source bitmap. Immutable for the rest of the conversion.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    format: Option<SourceFormat>,
}

impl SourceImage {
    /// Wrap an already-decoded bitmap.
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            format: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Format the bytes were decoded from, `None` when built in memory or
    /// when only `image`'s own guessing recognized it.
    pub fn format(&self) -> Option<SourceFormat> {
        self.format
    }
}

/// Decode `data` into a [`SourceImage`].
///
/// # Arguments
/// * `data` - Raw image file bytes
/// * `declared_mime` - MIME type reported by the caller, consulted only when
///   the content matches no known signature
/// * `limits` - Byte and dimension ceilings
/// * `budget` - Memory budget charged for the decoded buffer
///
/// # Errors
/// * `IcoError::Decode` - empty, corrupt or unsupported data, or a zero-sized image
/// * `IcoError::ResourceLimit` - input bytes, dimensions or memory over the limit
pub fn decode_source(
    data: &[u8],
    declared_mime: Option<&str>,
    limits: &DecodeLimits,
    budget: &MemoryBudget,
) -> Result<SourceImage> {
    if data.is_empty() {
        return Err(IcoError::Decode("Empty image data".to_string()));
    }
    if data.len() as u64 > limits.max_input_bytes {
        return Err(IcoError::limit(
            LimitKind::SourceBytes,
            format!(
                "input is {} bytes, limit is {} bytes",
                data.len(),
                limits.max_input_bytes
            ),
        ));
    }

    let format = magic::detect_source_format(data)
        .or_else(|| declared_mime.and_then(SourceFormat::from_mime_type));

    tracing::debug!(
        "Decoding {} bytes as {}",
        data.len(),
        format.map(|f| f.as_str()).unwrap_or("unknown format")
    );

    let pixels = match format {
        Some(SourceFormat::Svg) => decode_svg(data, limits, budget)?,
        raster => decode_raster(data, raster, limits, budget)?,
    };

    tracing::debug!(
        "Decoded source: {}x{} ({})",
        pixels.width(),
        pixels.height(),
        format.map(|f| f.as_str()).unwrap_or("guessed")
    );

    Ok(SourceImage { pixels, format })
}

fn check_dimensions(width: u32, height: u32, limits: &DecodeLimits) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(IcoError::Decode(format!(
            "Image has no pixels ({}x{})",
            width, height
        )));
    }
    if width > limits.max_dimension || height > limits.max_dimension {
        tracing::warn!(
            "Rejecting {}x{} source (max edge {})",
            width,
            height,
            limits.max_dimension
        );
        return Err(IcoError::limit(
            LimitKind::SourceDimensions,
            format!(
                "{}x{} exceeds the maximum of {}x{}",
                width, height, limits.max_dimension, limits.max_dimension
            ),
        ));
    }
    Ok(())
}

fn raster_reader<'a>(
    data: &'a [u8],
    format: Option<SourceFormat>,
) -> Result<ImageReader<Cursor<&'a [u8]>>> {
    match format.and_then(|f| f.raster_format()) {
        Some(known) => Ok(ImageReader::with_format(Cursor::new(data), known)),
        None => ImageReader::new(Cursor::new(data)).with_guessed_format().map_err(|e| {
            IcoError::Decode(format!(
                "Format detection failed for {}: {}",
                magic::describe(data),
                e
            ))
        }),
    }
}

fn decode_raster(
    data: &[u8],
    format: Option<SourceFormat>,
    limits: &DecodeLimits,
    budget: &MemoryBudget,
) -> Result<RgbaImage> {
    let (width, height) = raster_reader(data, format)?
        .into_dimensions()
        .map_err(|e| {
            IcoError::Decode(format!(
                "Failed to read image header ({}): {}",
                magic::describe(data),
                e
            ))
        })?;
    check_dimensions(width, height, limits)?;
    let _lease = budget.reserve_rgba(width, height, "decoded source")?;

    let decoded = raster_reader(data, format)?
        .decode()
        .map_err(|e| IcoError::Decode(format!("Failed to decode image: {}", e)))?;
    // RGBA8 sources are moved out as-is; other layouts convert once
    Ok(decoded.into_rgba8())
}

/// Raster size for an SVG of intrinsic size `width` x `height`.
///
/// The longest edge is raised to [`SVG_MIN_RASTER_EDGE`] and capped at the
/// dimension limit; the aspect ratio is kept.
pub fn svg_raster_size(width: f32, height: f32, max_dimension: u32) -> Result<(u32, u32)> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(IcoError::Decode(format!(
            "SVG has no usable size ({}x{})",
            width, height
        )));
    }
    let longest = width.max(height);
    let mut scale = if longest < SVG_MIN_RASTER_EDGE as f32 {
        SVG_MIN_RASTER_EDGE as f32 / longest
    } else {
        1.0
    };
    if longest * scale > max_dimension as f32 {
        scale = max_dimension as f32 / longest;
    }
    let w = ((width * scale).round() as u32).clamp(1, max_dimension.max(1));
    let h = ((height * scale).round() as u32).clamp(1, max_dimension.max(1));
    Ok((w, h))
}

fn decode_svg(data: &[u8], limits: &DecodeLimits, budget: &MemoryBudget) -> Result<RgbaImage> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(data, &options)
        .map_err(|e| IcoError::Decode(format!("Failed to parse SVG: {}", e)))?;

    let intrinsic = tree.size();
    let (width, height) =
        svg_raster_size(intrinsic.width(), intrinsic.height(), limits.max_dimension)?;
    check_dimensions(width, height, limits)?;
    let _lease = budget.reserve_rgba(width, height, "rasterized SVG")?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        IcoError::Decode(format!("Cannot allocate {}x{} SVG raster", width, height))
    })?;
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / intrinsic.width(),
        height as f32 / intrinsic.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    tracing::debug!(
        "Rasterized SVG from {}x{} to {}x{}",
        intrinsic.width(),
        intrinsic.height(),
        width,
        height
    );

    // tiny-skia stores premultiplied alpha; the pipeline works on straight alpha.
    let mut raw = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(width, height, raw)
        .ok_or_else(|| IcoError::Decode("SVG raster has an unexpected length".to_string()))
}
