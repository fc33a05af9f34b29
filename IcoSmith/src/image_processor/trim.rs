//! Content-aware trimming
//!
//! Small icons should not spend pixels on transparent padding. The trimmer
//! finds the bounding box of visible content (alpha > 8) on a sample no
//! larger than 512 px, projects it back to source coordinates with a 1 px
//! safety pad, and keeps the crop only when it removes at least 4% on one
//! axis.

use image::{imageops, RgbaImage};

const SAMPLE_MAX_EDGE: u32 = 512;
const ALPHA_THRESHOLD: u8 = 8;
const PAD: i64 = 1;
const MIN_SHRINK: f64 = 0.04;

/// A source-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TrimRect {
    /// The whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn is_full(&self, width: u32, height: u32) -> bool {
        *self == Self::full(width, height)
    }

    /// Copy the rectangle out of `source`.
    pub fn crop(&self, source: &RgbaImage) -> RgbaImage {
        imageops::crop_imm(source, self.x, self.y, self.width, self.height).to_image()
    }
}

/// Bounding box of visible content in `source`, or the full rectangle when
/// the image is fully transparent or the crop would be marginal.
pub fn compute_trim_rect(source: &RgbaImage) -> TrimRect {
    let (width, height) = source.dimensions();
    let full = TrimRect::full(width, height);
    if width == 0 || height == 0 {
        return full;
    }

    let max_side = width.max(height);
    let scale = if max_side > SAMPLE_MAX_EDGE {
        SAMPLE_MAX_EDGE as f64 / max_side as f64
    } else {
        1.0
    };
    let sample_w = ((width as f64 * scale).round() as u32).max(1);
    let sample_h = ((height as f64 * scale).round() as u32).max(1);
    let resampled;
    let sample = if (sample_w, sample_h) == (width, height) {
        source
    } else {
        resampled = imageops::thumbnail(source, sample_w, sample_h);
        &resampled
    };

    let mut min_x = i64::MAX;
    let mut min_y = i64::MAX;
    let mut max_x = -1i64;
    let mut max_y = -1i64;
    for (x, y, pixel) in sample.enumerate_pixels() {
        if pixel[3] > ALPHA_THRESHOLD {
            min_x = min_x.min(x as i64);
            min_y = min_y.min(y as i64);
            max_x = max_x.max(x as i64);
            max_y = max_y.max(y as i64);
        }
    }
    if max_x < 0 || max_y < 0 {
        tracing::debug!("Trim skipped: no visible pixels");
        return full;
    }

    let sx = (((min_x - PAD) as f64 / scale).floor().max(0.0)) as u32;
    let sy = (((min_y - PAD) as f64 / scale).floor().max(0.0)) as u32;
    let sw = (((max_x - min_x + 1 + PAD * 2) as f64 / scale).ceil() as u32).min(width - sx);
    let sh = (((max_y - min_y + 1 + PAD * 2) as f64 / scale).ceil() as u32).min(height - sy);

    let rect = accept_crop(
        width,
        height,
        TrimRect {
            x: sx,
            y: sy,
            width: sw.max(1),
            height: sh.max(1),
        },
    );
    tracing::debug!(
        "Trim rect for {}x{}: {:?}{}",
        width,
        height,
        rect,
        if rect.is_full(width, height) { " (full)" } else { "" }
    );
    rect
}

/// Keep `rect` only if it shrinks at least one axis by 4% or more.
pub fn accept_crop(full_width: u32, full_height: u32, rect: TrimRect) -> TrimRect {
    let shrink_x = 1.0 - rect.width as f64 / full_width as f64;
    let shrink_y = 1.0 - rect.height as f64 / full_height as f64;
    if shrink_x < MIN_SHRINK && shrink_y < MIN_SHRINK {
        TrimRect::full(full_width, full_height)
    } else {
        rect
    }
}
