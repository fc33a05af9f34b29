//! Advisory thin/bold hint for the rendered small icons
//!
//! Looks at the finished 16 px bitmap (or 32 px when 16 was not requested)
//! so a UI can suggest toggling bolding. It never changes any output.

use super::filters::coverage_ratio;
use image::RgbaImage;

const THIN_BELOW: f64 = 0.28;
const BOLD_ABOVE: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SmallIconHint {
    Thin,
    Bold,
}

/// Hint from `(size, bitmap)` pairs; `None` without a 16 or 32 px candidate
/// or when coverage sits between the thresholds.
pub fn compute_small_icon_hint<'a, I>(bitmaps: I) -> Option<SmallIconHint>
where
    I: IntoIterator<Item = (u32, &'a RgbaImage)>,
{
    let mut fallback = None;
    let mut candidate = None;
    for (size, pixels) in bitmaps {
        if size == 16 {
            candidate = Some(pixels);
            break;
        }
        if size == 32 && fallback.is_none() {
            fallback = Some(pixels);
        }
    }
    let coverage = coverage_ratio(candidate.or(fallback)?);
    if coverage < THIN_BELOW {
        Some(SmallIconHint::Thin)
    } else if coverage > BOLD_ABOVE {
        Some(SmallIconHint::Bold)
    } else {
        None
    }
}
