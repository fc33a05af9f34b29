//! Per-size rasterization
//!
//! This module orchestrates one target size:
//! 1. Prepare a `size` x `size` canvas (transparent or background color)
//! 2. Pick the source region (trimmed for sizes <= 32, full otherwise)
//! 3. Compute letterbox or stretch placement
//! 4. Draw: stepped downscale for crisp sizes <= 48, one Catmull-Rom step otherwise
//! 5. Run the size-banded filter chain
//! 6. Compress to PNG
//!
//! Temporary buffers are charged to the [`MemoryBudget`]; the caller accounts
//! for the canvas it keeps. The [`Deadline`] is checked while stepping down
//! and again before PNG compression.

use super::decoder::SourceImage;
use super::downscale::{self, StepFilter};
use super::encode;
use super::filters::{FilterReport, SmallIconFilter};
use super::resizer::{self, ResizeFilter};
use super::trim::TrimRect;
use crate::converter::limits::Deadline;
use crate::converter::options::RenderOptions;
use crate::utils::budget::MemoryBudget;
use crate::utils::error::Result;
use image::RgbaImage;

/// Sizes up to this render from the trimmed region.
pub const TRIM_MAX_SIZE: u32 = 32;
/// Sizes up to this use stepped downscaling when crisp mode is on.
pub const CRISP_MAX_SIZE: u32 = 48;
/// Sizes up to this use the gamma box steps and a nearest-neighbour final blit.
pub const TINY_MAX_SIZE: u32 = 16;

/// One finished target size.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedBitmap {
    size: u32,
    pixels: RgbaImage,
    png: Vec<u8>,
}

impl SizedBitmap {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// Lossless WebP of the same pixels, for packaging alongside the PNGs.
    pub fn encode_webp(&self) -> Result<Vec<u8>> {
        encode::encode_webp_lossless(&self.pixels)
    }

    /// Bytes held by this bitmap (pixels plus PNG).
    pub fn retained_bytes(&self) -> u64 {
        self.pixels.as_raw().len() as u64 + self.png.len() as u64
    }
}

/// Draw `source` onto a fresh `size` x `size` canvas (steps 1-4).
///
/// The source is never copied: the trimmed region is read in place and
/// only the scaled layer and stepping intermediates are charged to `budget`.
pub fn rasterize(
    source: &SourceImage,
    trim: &TrimRect,
    size: u32,
    options: &RenderOptions,
    budget: &MemoryBudget,
    deadline: &Deadline,
) -> Result<RgbaImage> {
    let mut canvas = resizer::blank_canvas(size, options.background().map(|c| c.to_array()));

    let full = source.pixels();
    let region = if size <= TRIM_MAX_SIZE && !trim.is_full(source.width(), source.height()) {
        *trim
    } else {
        TrimRect::full(source.width(), source.height())
    };

    let place = resizer::fit_within(
        region.width,
        region.height,
        size,
        options.preserve_aspect_ratio,
    );
    let _layer_lease = budget.reserve_rgba(place.width, place.height, "scaled layer")?;

    let layer = if options.crisp_small_icons && size <= CRISP_MAX_SIZE {
        let (step, blit) = if size <= TINY_MAX_SIZE {
            (StepFilter::GammaBox, ResizeFilter::Nearest)
        } else {
            (StepFilter::CatmullRom, ResizeFilter::CatmullRom)
        };
        let stepped = downscale::downscale_in_steps(
            full,
            region,
            place.width,
            place.height,
            step,
            budget,
            deadline,
        )?;
        resizer::resize_image(&stepped, place.width, place.height, blit)?
    } else {
        resizer::resize_region(full, region, place.width, place.height, ResizeFilter::CatmullRom)?
    };

    resizer::composite_over(&mut canvas, &layer, place.x, place.y);

    tracing::trace!(
        "Rasterized {}px from {}x{} region at ({}, {}) {}x{}",
        size,
        region.width,
        region.height,
        place.x,
        place.y,
        place.width,
        place.height
    );
    Ok(canvas)
}

/// Fully render one size (steps 1-6).
pub fn render_size(
    source: &SourceImage,
    trim: &TrimRect,
    size: u32,
    options: &RenderOptions,
    budget: &MemoryBudget,
    deadline: &Deadline,
) -> Result<(SizedBitmap, FilterReport)> {
    let mut pixels = rasterize(source, trim, size, options, budget, deadline)?;
    let report = SmallIconFilter::apply(&mut pixels, size, options);
    deadline.check("PNG encoding")?;
    let png = encode::encode_png(&pixels)?;
    Ok((SizedBitmap { size, pixels, png }, report))
}
