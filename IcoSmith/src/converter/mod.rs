//! Conversion orchestrator
//!
//! [`Converter`] drives one source image through every requested size and
//! assembles the ICO:
//!
//! 1. Acquire the busy gate (a second request fails with `Busy` at once)
//! 2. Validate the size list and decode the source (5% / 15%)
//! 3. Compute the trim rectangle once
//! 4. Render each size in request order (15% .. 85%)
//! 5. Build the ICO container (85%) and finish (100%)
//!
//! The pipeline is all-or-nothing: any error aborts the batch and no
//! partial ICO is returned. The wall-clock deadline is checked between
//! stages and every buffer is charged to a per-conversion memory budget.
//! Gate, budget leases and buffers are released by `Drop` on every exit
//! path.

pub mod limits;
pub mod options;
pub mod progress;
pub mod request;
pub mod state;
pub mod worker;

use crate::ico;
use crate::image_processor::{decoder, render, trim};
use crate::utils::budget::{rgba_bytes, MemoryBudget};
use crate::utils::error::{IcoError, LimitKind, Result};
use limits::{ConversionLimits, Deadline};
use progress::{ProgressReporter, ProgressUpdate};
use request::{ConversionOutput, ConversionRequest};
use state::ConversionGate;

/// Entry point for conversions.
///
/// Clones share one busy gate; separately constructed converters are
/// independent.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    limits: ConversionLimits,
    gate: ConversionGate,
}

impl Converter {
    /// Converter with the built-in default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter with limits read from the environment.
    pub fn from_env() -> Self {
        Self::with_limits(ConversionLimits::from_env())
    }

    pub fn with_limits(limits: ConversionLimits) -> Self {
        Self {
            limits,
            gate: ConversionGate::new(),
        }
    }

    pub fn limits(&self) -> &ConversionLimits {
        &self.limits
    }

    /// Whether a conversion on this converter (or a clone) is running.
    pub fn is_busy(&self) -> bool {
        self.gate.state() == state::ConversionState::Running
    }

    /// Run a conversion on the calling thread.
    ///
    /// `on_progress` is called with non-decreasing percentages: once after
    /// validation, once after decode, once per finished size, and at the
    /// start and end of ICO assembly.
    ///
    /// # Errors
    /// * `IcoError::Busy` - another conversion holds the gate
    /// * `IcoError::InvalidInput` - empty size list or a size outside 1..=256
    /// * `IcoError::Decode` - the source cannot be decoded
    /// * `IcoError::ResourceLimit` - input, dimension, canvas or memory limit hit
    /// * `IcoError::Timeout` - the processing budget ran out
    /// * `IcoError::Encoding` - PNG or ICO assembly failed
    pub fn convert<F>(&self, request: &ConversionRequest, on_progress: F) -> Result<ConversionOutput>
    where
        F: FnMut(&ProgressUpdate),
    {
        let _guard = self.gate.try_acquire()?;
        run_conversion(request, &self.limits, on_progress)
    }
}

/// The pipeline itself, shared by [`Converter::convert`] and the worker.
pub(crate) fn run_conversion<F>(
    request: &ConversionRequest,
    limits: &ConversionLimits,
    on_progress: F,
) -> Result<ConversionOutput>
where
    F: FnMut(&ProgressUpdate),
{
    let deadline = Deadline::start(limits.max_processing);
    let budget = MemoryBudget::new(limits.max_memory_bytes);
    let mut reporter = ProgressReporter::new(on_progress);
    let options = request.options().resolved();
    let sizes = request.sizes();

    tracing::info!(
        "Starting conversion: {} bytes, sizes {:?}",
        request.data().len(),
        sizes
    );

    request.validate_sizes(limits)?;
    reporter.report(progress::VALIDATED, "Validating input");

    let source = decoder::decode_source(
        request.data(),
        request.mime_type(),
        &limits.decode_limits(),
        &budget,
    )?;
    let source_bytes = rgba_bytes(source.width(), source.height());
    if source_bytes > limits.max_canvas_bytes {
        return Err(IcoError::limit(
            LimitKind::CanvasSize,
            format!(
                "{}x{} source needs {} bytes, limit is {}",
                source.width(),
                source.height(),
                source_bytes,
                limits.max_canvas_bytes
            ),
        ));
    }
    let _source_lease = budget.reserve(source_bytes, "source image")?;
    deadline.check("decode")?;
    reporter.report(progress::DECODED, "Processing image");

    let trim_rect = trim::compute_trim_rect(source.pixels());

    let total = sizes.len();
    let mut bitmaps = Vec::with_capacity(total);
    let mut leases = Vec::with_capacity(total * 2);
    for (index, &size) in sizes.iter().enumerate() {
        deadline.check("rendering")?;
        leases.push(budget.reserve_rgba(size, size, "icon canvas")?);

        let (bitmap, report) =
            render::render_size(&source, &trim_rect, size, &options, &budget, &deadline)?;
        leases.push(budget.reserve(bitmap.png().len() as u64, "PNG payload")?);

        tracing::debug!(
            "Rendered {}x{} ({} PNG bytes, {} dilation passes, {:?})",
            size,
            size,
            bitmap.png().len(),
            report.dilation_passes,
            report.profile
        );
        bitmaps.push(bitmap);
        reporter.report(
            progress::size_progress(index, total),
            format!("Rendered {}x{}", size, size),
        );
    }

    deadline.check("ICO assembly")?;
    reporter.report(progress::BUILDING_ICO, "Building ICO");

    let entries: Vec<(u32, &[u8])> = bitmaps.iter().map(|b| (b.size(), b.png())).collect();
    let ico_len = ico::HEADER_LEN as u64
        + (ico::DIR_ENTRY_LEN * entries.len()) as u64
        + entries.iter().map(|(_, png)| png.len() as u64).sum::<u64>();
    let _ico_lease = budget.reserve(ico_len, "ICO container")?;
    let ico = ico::encode_ico(&entries)?;
    drop(entries);

    reporter.report(progress::DONE, "Done");
    tracing::info!(
        "Conversion finished: {} entries, {} bytes in {:?} (peak budget {} of {} bytes)",
        bitmaps.len(),
        ico.len(),
        deadline.elapsed(),
        budget.peak(),
        budget.limit()
    );

    Ok(ConversionOutput { ico, bitmaps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_source(size: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(size, size, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([240, 120, 20, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_convert_reports_monotonic_progress() {
        let converter = Converter::new();
        let request = ConversionRequest::new(png_source(64), vec![16, 32, 48]);
        let mut seen = Vec::new();
        let output = converter
            .convert(&request, |u| seen.push((u.percent, u.step.clone())))
            .unwrap();

        assert_eq!(output.bitmaps.len(), 3);
        let percents: Vec<u8> = seen.iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![5, 15, 38, 62, 85, 85, 100]);
        assert_eq!(seen.last().unwrap().1, "Done");
        assert!(!converter.is_busy());
    }

    #[test]
    fn test_gate_released_after_error() {
        let converter = Converter::new();
        let bad = ConversionRequest::new(vec![1u8, 2, 3], vec![16]);
        assert_eq!(
            converter.convert(&bad, |_| {}).unwrap_err().kind(),
            ErrorKind::Decode
        );
        assert!(!converter.is_busy());
        let good = ConversionRequest::new(png_source(32), vec![16]);
        assert!(converter.convert(&good, |_| {}).is_ok());
    }

    #[test]
    fn test_invalid_sizes_fail_before_decode() {
        let converter = Converter::new();
        let mut calls = 0;
        let request = ConversionRequest::new(png_source(32), Vec::<u32>::new());
        let err = converter.convert(&request, |_| calls += 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_source_canvas_limit() {
        let limits = ConversionLimits {
            max_canvas_bytes: 40 * 40 * 4,
            ..ConversionLimits::default()
        };
        let converter = Converter::with_limits(limits);
        let request = ConversionRequest::new(png_source(64), vec![16]);
        let err = converter.convert(&request, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            IcoError::ResourceLimit {
                limit: LimitKind::CanvasSize,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_time_budget_times_out() {
        let limits = ConversionLimits {
            max_processing: std::time::Duration::ZERO,
            ..ConversionLimits::default()
        };
        let converter = Converter::with_limits(limits);
        let request = ConversionRequest::new(png_source(32), vec![16]);
        let err = converter.convert(&request, |_| {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_memory_budget_exhaustion() {
        let limits = ConversionLimits {
            max_memory_bytes: 64 * 64 * 4 + 100,
            ..ConversionLimits::default()
        };
        let converter = Converter::with_limits(limits);
        let request = ConversionRequest::new(png_source(64), vec![16, 256]);
        let err = converter.convert(&request, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            IcoError::ResourceLimit {
                limit: LimitKind::MemoryBudget,
                ..
            }
        ));
    }
}
