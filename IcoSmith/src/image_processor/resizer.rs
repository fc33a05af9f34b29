//! Letterbox geometry, single-step resampling and compositing
//!
//! Resampling goes through `fast_image_resize` (SIMD, alpha-aware
//! convolution). Compositing is straight-alpha "source-over" onto a canvas
//! that is either transparent or filled with the background color.

use super::trim::TrimRect;
use crate::utils::error::{IcoError, Result};
use fast_image_resize as fr;
use fast_image_resize::images::{Image, ImageRef};
use image::{Rgba, RgbaImage};

/// Resampling algorithm for one draw step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Catmull-Rom cubic convolution; the "high quality" interpolation
    CatmullRom,

    /// Nearest neighbour; keeps hard edges on the final blit of tiny icons
    Nearest,
}

impl ResizeFilter {
    fn algorithm(self) -> fr::ResizeAlg {
        match self {
            ResizeFilter::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
            ResizeFilter::Nearest => fr::ResizeAlg::Nearest,
        }
    }
}

/// Where a scaled source lands inside a square canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Fit a `src_width` x `src_height` region into a `size` x `size` canvas
///
/// With `preserve_aspect_ratio` the region is scaled by
/// `min(size/src_width, size/src_height)` (upscaling included) and centered,
/// leaving padding on the shorter axis. Without it the region is stretched
/// to fill the whole canvas.
///
/// # Examples
/// ```
/// use icosmith::image_processor::resizer::fit_within;
///
/// // Landscape 1000x500 into 16 -> 16x8, centered vertically
/// let p = fit_within(1000, 500, 16, true);
/// assert_eq!((p.x, p.y, p.width, p.height), (0, 4, 16, 8));
/// ```
pub fn fit_within(src_width: u32, src_height: u32, size: u32, preserve_aspect_ratio: bool) -> Placement {
    let full = Placement {
        x: 0,
        y: 0,
        width: size,
        height: size,
    };
    if !preserve_aspect_ratio || src_width == 0 || src_height == 0 {
        return full;
    }

    let rx = size as f64 / src_width as f64;
    let ry = size as f64 / src_height as f64;
    let scale = rx.min(ry);

    let width = ((src_width as f64 * scale).round() as u32).clamp(1, size);
    let height = ((src_height as f64 * scale).round() as u32).clamp(1, size);

    Placement {
        x: (size - width) / 2,
        y: (size - height) / 2,
        width,
        height,
    }
}

/// Resize `source` to exactly `target_width` x `target_height` in one step.
pub fn resize_image(
    source: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: ResizeFilter,
) -> Result<RgbaImage> {
    if target_width == 0 || target_height == 0 {
        return Err(IcoError::InvalidInput(
            "Target dimensions must be greater than zero".to_string(),
        ));
    }

    let (src_width, src_height) = source.dimensions();
    if src_width == target_width && src_height == target_height {
        return Ok(source.clone());
    }

    resize_region(
        source,
        TrimRect::full(src_width, src_height),
        target_width,
        target_height,
        filter,
    )
}

/// Resize the `region` of `source` to `target_width` x `target_height`.
///
/// The source buffer is borrowed, not copied; the region becomes a crop box
/// on the resampler.
pub fn resize_region(
    source: &RgbaImage,
    region: TrimRect,
    target_width: u32,
    target_height: u32,
    filter: ResizeFilter,
) -> Result<RgbaImage> {
    if target_width == 0 || target_height == 0 {
        return Err(IcoError::InvalidInput(
            "Target dimensions must be greater than zero".to_string(),
        ));
    }

    let (src_width, src_height) = source.dimensions();
    let src_view = ImageRef::new(src_width, src_height, source.as_raw(), fr::PixelType::U8x4)
        .map_err(|e| IcoError::Encoding(format!("Failed to create source view: {}", e)))?;

    let mut dst_image = Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut options = fr::ResizeOptions::new().resize_alg(filter.algorithm());
    if !region.is_full(src_width, src_height) {
        options = options.crop(
            region.x as f64,
            region.y as f64,
            region.width as f64,
            region.height as f64,
        );
    }

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, &options)
        .map_err(|e| IcoError::Encoding(format!("Resize operation failed: {}", e)))?;

    RgbaImage::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| IcoError::Encoding("Failed to create output image".to_string()))
}

/// A `size` x `size` canvas, transparent or filled with an opaque color.
pub fn blank_canvas(size: u32, background: Option<[u8; 3]>) -> RgbaImage {
    match background {
        Some([r, g, b]) => RgbaImage::from_pixel(size, size, Rgba([r, g, b, 255])),
        None => RgbaImage::new(size, size),
    }
}

/// Draw `layer` onto `canvas` at (`x`, `y`) with source-over blending.
///
/// Pixels falling outside the canvas are clipped.
pub fn composite_over(canvas: &mut RgbaImage, layer: &RgbaImage, x: u32, y: u32) {
    let (cw, ch) = canvas.dimensions();
    for (lx, ly, src) in layer.enumerate_pixels() {
        let (px, py) = (x + lx, y + ly);
        if px >= cw || py >= ch {
            continue;
        }
        let dst = canvas.get_pixel_mut(px, py);
        *dst = blend_over(*src, *dst);
    }
}

fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}
