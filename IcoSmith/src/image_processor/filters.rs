//! Small-icon quality filters
//!
//! Pixel-domain passes that keep tiny icons legible. All of them are pure
//! functions of the buffer and their scalar arguments. Passes that look at
//! neighbours read from a snapshot of the input, so the result never depends
//! on scan order.
//!
//! [`SmallIconFilter::apply`] chains them per size band:
//!
//! | Size      | Chain                                                        |
//! |-----------|--------------------------------------------------------------|
//! | <= 16     | quantize, profile, dilate, sharpen, outline                  |
//! | 17 - 32   | sharpen                                                      |
//! | 33 - 96   | light sharpen (coverage-adaptive with the auto profile)      |
//! | > 96      | edge-adaptive sharpen, only with `sharpen_large_icons`       |

use super::tuning::{self, CoverageProfile, SharpenParams, TuningInputs};
use crate::converter::options::RenderOptions;
use image::{Rgba, RgbaImage};

/// Alpha above which a pixel counts as solid for coverage.
pub const SOLID_ALPHA: u8 = 190;
/// Alpha quantization cut-off at 16 px and below.
pub const QUANTIZE_ALPHA: u8 = 48;

const DILATE_SOURCE_ALPHA: u8 = 150;
const DILATE_MIN_ALPHA: u8 = 210;
const OUTLINE_SOURCE_ALPHA: u8 = 120;
const OUTLINE_ALPHA: u8 = 100;
const VISIBLE_ALPHA: u8 = 40;
/// Below this dilation runs once even without bolding mode.
const MICRO_BOLD_COVERAGE: f64 = 0.30;

const NEIGHBOURS: [(i64, i64); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[inline]
fn luma(p: &Rgba<u8>) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

/// In-bounds pixels of the 3x3 window around (x, y), in row-major order.
fn window<'a>(img: &'a RgbaImage, x: u32, y: u32) -> impl Iterator<Item = &'a Rgba<u8>> + 'a {
    let (w, h) = img.dimensions();
    NEIGHBOURS.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
            None
        } else {
            Some(img.get_pixel(nx as u32, ny as u32))
        }
    })
}

/// Snap alpha to 0 or 255 around `threshold` (strictly above is opaque).
pub fn alpha_quantize(img: &mut RgbaImage, threshold: u8) {
    for pixel in img.pixels_mut() {
        pixel[3] = if pixel[3] > threshold { 255 } else { 0 };
    }
}

/// Fraction of pixels with alpha above [`SOLID_ALPHA`].
pub fn coverage_ratio(img: &RgbaImage) -> f64 {
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let solid = img.pixels().filter(|p| p[3] > SOLID_ALPHA).count() as u64;
    solid as f64 / total as f64
}

/// One pass of neutral dilation.
///
/// Every fully transparent pixel with a neighbour above alpha 150 takes the
/// first such neighbour's luminance as a gray value and alpha 210.
pub fn dilate_alpha_neutral(img: &mut RgbaImage) {
    let src = img.clone();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if src.get_pixel(x, y)[3] > 0 {
            continue;
        }
        if let Some(neighbour) = window(&src, x, y).find(|p| p[3] > DILATE_SOURCE_ALPHA) {
            let gray = luma(neighbour) as u8;
            *pixel = Rgba([gray, gray, gray, pixel[3].max(DILATE_MIN_ALPHA)]);
        }
    }
}

/// Luminance-domain sharpen with a contrast stretch around 128.
///
/// The 3x3 kernel `[0,-1,0,-1,5,-1,0,-1,0]` runs over the luminance map with
/// clamped edges. Pixels whose response differs from their luminance by less
/// than `threshold` are left untouched; the rest get
/// `(c - 128) * contrast + 128 + amount * delta` on each color channel.
pub fn luminance_sharpen(img: &mut RgbaImage, amount: f32, threshold: f32, contrast: f32) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let lum: Vec<f32> = img.pixels().map(luma).collect();
    let at = |x: i64, y: i64| {
        let cx = x.clamp(0, w as i64 - 1) as usize;
        let cy = y.clamp(0, h as i64 - 1) as usize;
        lum[cy * w as usize + cx]
    };

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let (xi, yi) = (x as i64, y as i64);
        let center = at(xi, yi);
        let response =
            5.0 * center - at(xi, yi - 1) - at(xi - 1, yi) - at(xi + 1, yi) - at(xi, yi + 1);
        let delta = response - center;
        if delta.abs() < threshold {
            continue;
        }
        let adjust = amount * delta;
        for c in 0..3 {
            let value = (pixel[c] as f32 - 128.0) * contrast + 128.0 + adjust;
            pixel[c] = value.clamp(0.0, 255.0).round() as u8;
        }
    }
}

/// Mean luminance of pixels with alpha above 40, 128 when there are none.
pub fn mean_luminance(img: &RgbaImage) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0u64;
    for pixel in img.pixels().filter(|p| p[3] > VISIBLE_ALPHA) {
        sum += luma(pixel) as f64;
        count += 1;
    }
    if count == 0 {
        128.0
    } else {
        sum / count as f64
    }
}

/// 1 px outline: transparent pixels next to an alpha > 120 pixel take
/// `color`, keeping any higher alpha they already have.
pub fn add_outline(img: &mut RgbaImage, color: Rgba<u8>) {
    let src = img.clone();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if src.get_pixel(x, y)[3] > 0 {
            continue;
        }
        if window(&src, x, y).any(|p| p[3] > OUTLINE_SOURCE_ALPHA) {
            *pixel = Rgba([color[0], color[1], color[2], pixel[3].max(color[3])]);
        }
    }
}

/// Mean Sobel gradient magnitude over interior pixels with alpha above 40.
///
/// Roughly 0 (flat) to a few hundred (checkerboard); 0 when no pixel qualifies.
pub fn sobel_edge_strength(img: &RgbaImage) -> f64 {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let lum: Vec<f32> = img.pixels().map(luma).collect();
    let at = |x: u32, y: u32| lum[(y * w + x) as usize];

    let mut sum = 0.0f64;
    let mut count = 0u64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if img.get_pixel(x, y)[3] <= VISIBLE_ALPHA {
                continue;
            }
            let gx = -at(x - 1, y - 1) + at(x + 1, y - 1) - 2.0 * at(x - 1, y)
                + 2.0 * at(x + 1, y)
                - at(x - 1, y + 1)
                + at(x + 1, y + 1);
            let gy = -at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1)
                + at(x - 1, y + 1)
                + 2.0 * at(x, y + 1)
                + at(x + 1, y + 1);
            sum += ((gx * gx + gy * gy) as f64).sqrt();
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// What [`SmallIconFilter::apply`] decided for one bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterReport {
    pub profile: Option<CoverageProfile>,
    pub dilation_passes: u32,
    pub params: Option<SharpenParams>,
    pub outline: Option<Rgba<u8>>,
}

impl FilterReport {
    fn skipped() -> Self {
        Self {
            profile: None,
            dilation_passes: 0,
            params: None,
            outline: None,
        }
    }
}

/// The size-banded filter chain.
pub struct SmallIconFilter;

impl SmallIconFilter {
    /// Largest size that gets the light sharpen without opting in.
    pub const LIGHT_SHARPEN_MAX: u32 = 96;

    /// Run the chain for a `size` px bitmap in place.
    ///
    /// `options` should already be [`RenderOptions::resolved`].
    pub fn apply(img: &mut RgbaImage, size: u32, options: &RenderOptions) -> FilterReport {
        if size > Self::LIGHT_SHARPEN_MAX && !options.sharpen_large_icons {
            return FilterReport::skipped();
        }
        let tiny = size <= 16;
        let auto = options.auto_profile;

        if tiny {
            alpha_quantize(img, QUANTIZE_ALPHA);
        }

        let mut strength = options.small_icon_strength;
        let mut small_mode = options.small_icon_mode;
        let sharp_preset = options.is_sharp_preset();
        let soft_preset = options.is_soft_preset();

        let mut profile = None;
        if auto && tiny {
            let selected = tuning::select_profile(coverage_ratio(img));
            strength = selected.strength();
            if let Some(mode) = selected.small_icon_mode() {
                small_mode = mode;
            }
            profile = Some(selected);
        }

        let mut dilation_passes = 0;
        if tiny {
            if small_mode {
                dilation_passes = (strength.round() as u32).max(1);
                if soft_preset {
                    dilation_passes = dilation_passes.max(2);
                }
            } else if coverage_ratio(img) < MICRO_BOLD_COVERAGE {
                dilation_passes = 1;
            }
            for _ in 0..dilation_passes {
                dilate_alpha_neutral(img);
            }
        }

        let inputs = TuningInputs {
            strength,
            sharp_preset,
            coverage: auto.then(|| coverage_ratio(img)),
            edge_strength: (auto && size > Self::LIGHT_SHARPEN_MAX).then(|| sobel_edge_strength(img)),
        };
        let params = tuning::clamp_consistency(size, tuning::sharpen_params(size, &inputs));
        luminance_sharpen(img, params.amount, tuning::sharpen_threshold(size), params.contrast);

        let mut outline = None;
        if tiny {
            let avg = mean_luminance(img);
            let wanted = match options.outline_16px {
                Some(explicit) => explicit,
                None => auto && (85.0..=170.0).contains(&avg),
            };
            if wanted {
                let color = if avg < 128.0 {
                    Rgba([255, 255, 255, OUTLINE_ALPHA])
                } else {
                    Rgba([0, 0, 0, OUTLINE_ALPHA])
                };
                add_outline(img, color);
                outline = Some(color);
            }
        }

        tracing::debug!(
            "Filters for {}px: profile={:?} dilation={} amount={:.3} contrast={:.3} outline={}",
            size,
            profile,
            dilation_passes,
            params.amount,
            params.contrast,
            outline.is_some()
        );

        FilterReport {
            profile,
            dilation_passes,
            params: Some(params),
            outline,
        }
    }
}
