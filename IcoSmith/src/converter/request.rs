//! Conversion request and output types

use super::limits::ConversionLimits;
use super::options::RenderOptions;
use crate::image_processor::hint::{self, SmallIconHint};
use crate::image_processor::render::SizedBitmap;
use crate::utils::error::{IcoError, LimitKind, Result};

/// Sizes preselected when the caller has no preference.
pub const DEFAULT_SIZES: [u32; 6] = [16, 32, 48, 64, 128, 256];

/// Smallest and largest size an ICO entry can hold.
pub const MIN_ICON_SIZE: u32 = 1;
pub const MAX_ICON_SIZE: u32 = 256;

/// Everything one conversion needs: source bytes, sizes and options.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    data: Vec<u8>,
    mime_type: Option<String>,
    sizes: Vec<u32>,
    options: RenderOptions,
}

impl ConversionRequest {
    /// Request with default options. Sizes are rendered in the given order.
    pub fn new(data: impl Into<Vec<u8>>, sizes: impl Into<Vec<u32>>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
            sizes: sizes.into(),
            options: RenderOptions::default(),
        }
    }

    /// Declared MIME type, consulted only when the bytes are not recognized.
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Check the size list against the ICO range and the canvas limit.
    pub(crate) fn validate_sizes(&self, limits: &ConversionLimits) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(IcoError::InvalidInput("No icon sizes requested".to_string()));
        }
        if self.sizes.len() > u16::MAX as usize {
            return Err(IcoError::InvalidInput(format!(
                "{} sizes requested, an ICO holds at most {}",
                self.sizes.len(),
                u16::MAX
            )));
        }
        for &size in &self.sizes {
            if !(MIN_ICON_SIZE..=MAX_ICON_SIZE).contains(&size) {
                return Err(IcoError::InvalidInput(format!(
                    "Icon size {} is outside {}..={}",
                    size, MIN_ICON_SIZE, MAX_ICON_SIZE
                )));
            }
            let canvas_bytes = size as u64 * size as u64 * 4;
            if canvas_bytes > limits.max_canvas_bytes {
                return Err(IcoError::limit(
                    LimitKind::CanvasSize,
                    format!(
                        "{}x{} canvas needs {} bytes, limit is {}",
                        size, size, canvas_bytes, limits.max_canvas_bytes
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The complete ICO container
    pub ico: Vec<u8>,
    /// One bitmap per requested size, in request order
    pub bitmaps: Vec<SizedBitmap>,
}

impl ConversionOutput {
    /// `(size, png)` pairs in request order, as embedded in the ICO.
    pub fn png_entries(&self) -> Vec<(u32, &[u8])> {
        self.bitmaps.iter().map(|b| (b.size(), b.png())).collect()
    }

    /// First bitmap rendered at `size`.
    pub fn bitmap(&self, size: u32) -> Option<&SizedBitmap> {
        self.bitmaps.iter().find(|b| b.size() == size)
    }

    /// Thin/bold advisory from the 16 px (or 32 px) bitmap.
    pub fn hint(&self) -> Option<SmallIconHint> {
        hint::compute_small_icon_hint(self.bitmaps.iter().map(|b| (b.size(), b.pixels())))
    }
}
