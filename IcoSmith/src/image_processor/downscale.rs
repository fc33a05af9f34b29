//! Stepped downscaling
//!
//! A single large-ratio resample (1024 -> 16) aliases badly. Halving
//! repeatedly keeps every step close to 2:1, and only the last draw from
//! the near-target intermediate to the exact target is left to the caller.
//!
//! Two step filters are available:
//! - [`StepFilter::CatmullRom`] resamples each halving with cubic convolution
//! - [`StepFilter::GammaBox`] averages 2x2 blocks in linear light, weighted by
//!   alpha, which avoids dark fringes along transparent edges

use super::resizer::{self, ResizeFilter};
use super::trim::TrimRect;
use crate::converter::limits::Deadline;
use crate::utils::budget::{BudgetLease, MemoryBudget};
use crate::utils::error::{IcoError, Result};
use image::{imageops, GenericImageView, Rgba, RgbaImage};
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::ops::Deref;

const GAMMA: f32 = 2.2;

/// sRGB byte -> linear light, precomputed once.
static TO_LINEAR: Lazy<[f32; 256]> = Lazy::new(|| {
    let mut table = [0.0f32; 256];
    for (value, slot) in table.iter_mut().enumerate() {
        *slot = (value as f32 / 255.0).powf(GAMMA);
    }
    table
});

fn to_display(linear: f32) -> u8 {
    // Truncates like an integer store, never rounds up.
    (linear.powf(1.0 / GAMMA).clamp(0.0, 1.0) * 255.0) as u8
}

/// Filter used for each intermediate halving step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFilter {
    CatmullRom,
    GammaBox,
}

/// Result of [`downscale_in_steps`].
///
/// Either the last intermediate together with its budget lease, or the
/// untouched source when no halving applied and the region is the whole
/// image.
#[derive(Debug)]
pub struct Stepped<'a, 'b> {
    image: Cow<'a, RgbaImage>,
    _lease: Option<BudgetLease<'b>>,
}

impl Stepped<'_, '_> {
    /// True when the source was handed back without a copy.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.image, Cow::Borrowed(_))
    }

    pub fn into_image(self) -> RgbaImage {
        self.image.into_owned()
    }
}

impl Deref for Stepped<'_, '_> {
    type Target = RgbaImage;

    fn deref(&self) -> &RgbaImage {
        &self.image
    }
}

/// Whether another halving still stays at or above the target on both axes.
fn can_halve(width: u32, height: u32, target_width: u32, target_height: u32) -> bool {
    width as u64 >= 2 * target_width as u64 && height as u64 >= 2 * target_height as u64
}

fn halve(
    source: &RgbaImage,
    region: TrimRect,
    width: u32,
    height: u32,
    filter: StepFilter,
) -> Result<RgbaImage> {
    match filter {
        StepFilter::GammaBox => Ok(box_downscale_by2(&*imageops::crop_imm(
            source,
            region.x,
            region.y,
            region.width,
            region.height,
        ))),
        StepFilter::CatmullRom => {
            resizer::resize_region(source, region, width, height, ResizeFilter::CatmullRom)
        }
    }
}

/// Halve `region` of `source` until the next halving would undershoot the target.
///
/// Each step produces `max(target, floor(current / 2))` per axis. The
/// result is at least `target_width` x `target_height` and less than twice
/// that on at least one axis. The source is read in place: only the
/// intermediates are allocated and charged to `budget`, and when no halving
/// applies to the full image the source itself is returned. The deadline is
/// checked before every halving.
pub fn downscale_in_steps<'a, 'b>(
    source: &'a RgbaImage,
    region: TrimRect,
    target_width: u32,
    target_height: u32,
    filter: StepFilter,
    budget: &'b MemoryBudget,
    deadline: &Deadline,
) -> Result<Stepped<'a, 'b>> {
    if target_width == 0 || target_height == 0 {
        return Err(IcoError::InvalidInput(
            "Target dimensions must be greater than zero".to_string(),
        ));
    }
    let (src_width, src_height) = source.dimensions();
    if region.width == 0
        || region.height == 0
        || region.x as u64 + region.width as u64 > src_width as u64
        || region.y as u64 + region.height as u64 > src_height as u64
    {
        return Err(IcoError::InvalidInput(format!(
            "Region {:?} is outside the {}x{} source",
            region, src_width, src_height
        )));
    }

    let (mut width, mut height) = (region.width, region.height);
    let mut current: Option<(RgbaImage, BudgetLease<'b>)> = None;
    let mut steps = 0u32;

    while can_halve(width, height, target_width, target_height) {
        deadline.check("stepped downscale")?;
        let next_width = target_width.max(width / 2);
        let next_height = target_height.max(height / 2);
        let lease = budget.reserve_rgba(next_width, next_height, "downscale intermediate")?;
        let next = match &current {
            Some((image, _)) => halve(
                image,
                TrimRect::full(width, height),
                next_width,
                next_height,
                filter,
            )?,
            None => halve(source, region, next_width, next_height, filter)?,
        };
        current = Some((next, lease));
        width = next_width;
        height = next_height;
        steps += 1;
    }

    tracing::trace!(
        "Stepped {}x{} -> {}x{} in {} halvings ({:?})",
        region.width,
        region.height,
        width,
        height,
        steps,
        filter
    );

    Ok(match current {
        Some((image, lease)) => Stepped {
            image: Cow::Owned(image),
            _lease: Some(lease),
        },
        None if region.is_full(src_width, src_height) => Stepped {
            image: Cow::Borrowed(source),
            _lease: None,
        },
        None => {
            let lease = budget.reserve_rgba(region.width, region.height, "trimmed region")?;
            Stepped {
                image: Cow::Owned(region.crop(source)),
                _lease: Some(lease),
            }
        }
    })
}

/// Gamma-correct, alpha-weighted 2x2 box reduction.
///
/// Output is `max(1, floor(w/2))` x `max(1, floor(h/2))`. Samples past the
/// right or bottom edge repeat the last row/column. Output alpha is the plain
/// mean of the four alphas; fully transparent blocks come out as (0,0,0,0).
pub fn box_downscale_by2<I>(source: &I) -> RgbaImage
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (w, h) = source.dimensions();
    let new_w = (w / 2).max(1);
    let new_h = (h / 2).max(1);
    let lin = &*TO_LINEAR;

    RgbaImage::from_fn(new_w, new_h, |x, y| {
        let sx = x * 2;
        let sy = y * 2;
        let mut rgb = [0.0f32; 3];
        let mut alpha_sum = 0.0f32;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let p = source.get_pixel((sx + dx).min(w - 1), (sy + dy).min(h - 1));
            let a = p[3] as f32 / 255.0;
            for c in 0..3 {
                rgb[c] += lin[p[c] as usize] * a;
            }
            alpha_sum += a;
        }
        let alpha = alpha_sum / 4.0;
        if alpha > 0.0 {
            Rgba([
                to_display(rgb[0] / alpha_sum),
                to_display(rgb[1] / alpha_sum),
                to_display(rgb[2] / alpha_sum),
                (alpha * 255.0).round() as u8,
            ])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Gamma-box halving down to near the target, then a nearest-neighbour snap
/// to the exact size.
pub fn box_downscale_to(
    source: &RgbaImage,
    target_width: u32,
    target_height: u32,
    budget: &MemoryBudget,
    deadline: &Deadline,
) -> Result<RgbaImage> {
    let (width, height) = source.dimensions();
    let stepped = downscale_in_steps(
        source,
        TrimRect::full(width, height),
        target_width,
        target_height,
        StepFilter::GammaBox,
        budget,
        deadline,
    )?;
    if stepped.dimensions() == (target_width, target_height) {
        return Ok(stepped.into_image());
    }
    resizer::resize_image(&stepped, target_width, target_height, ResizeFilter::Nearest)
}
