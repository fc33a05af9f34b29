//! Conversion limits and the wall-clock deadline

use crate::image_processor::decoder::DecodeLimits;
use crate::utils::error::{IcoError, Result};
use crate::utils::settings;
use std::time::{Duration, Instant};

const MIB: u64 = 1024 * 1024;

/// Ceilings for one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionLimits {
    /// Wall-clock budget for the whole conversion
    pub max_processing: Duration,
    /// Cumulative bytes of live pixel buffers and payloads
    pub max_memory_bytes: u64,
    /// Largest accepted source width or height
    pub max_source_dimension: u32,
    /// Largest accepted input length
    pub max_input_bytes: u64,
    /// Largest destination canvas (`size * size * 4`)
    pub max_canvas_bytes: u64,
}

impl Default for ConversionLimits {
    fn default() -> Self {
        Self {
            max_processing: Duration::from_secs(60),
            max_memory_bytes: 100 * MIB,
            max_source_dimension: 4096,
            max_input_bytes: 50 * MIB,
            max_canvas_bytes: 4096 * 4096 * 4,
        }
    }
}

impl ConversionLimits {
    /// Defaults overridden by `ICOSMITH_MAX_PROCESSING_MS`,
    /// `ICOSMITH_MAX_MEMORY_MB` and `ICOSMITH_MAX_SOURCE_DIMENSION`.
    ///
    /// Overriding the memory budget also sets the input limit to half of it.
    pub fn from_env() -> Self {
        let mut limits = Self::default();
        if let Some(ms) = settings::read_u64(settings::MAX_PROCESSING_MS_VAR) {
            limits.max_processing = Duration::from_millis(ms);
        }
        if let Some(mb) = settings::read_u64(settings::MAX_MEMORY_MB_VAR) {
            limits.max_memory_bytes = mb.saturating_mul(MIB);
            limits.max_input_bytes = limits.max_memory_bytes / 2;
        }
        if let Some(edge) = settings::read_u64(settings::MAX_SOURCE_DIMENSION_VAR) {
            limits.max_source_dimension = u32::try_from(edge).unwrap_or(u32::MAX);
        }
        tracing::debug!("Conversion limits: {:?}", limits);
        limits
    }

    pub fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_input_bytes: self.max_input_bytes,
            max_dimension: self.max_source_dimension,
        }
    }
}

/// Wall-clock budget started at the beginning of a conversion.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self::start(Duration::MAX)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail with [`IcoError::Timeout`] once the budget is used up.
    pub fn check(&self, stage: &str) -> Result<()> {
        let elapsed = self.elapsed();
        if elapsed >= self.budget {
            tracing::warn!(
                "Processing budget of {:?} exhausted at {} ({:?})",
                self.budget,
                stage,
                elapsed
            );
            return Err(IcoError::Timeout {
                elapsed_ms: elapsed.as_millis(),
                budget_ms: self.budget.as_millis(),
            });
        }
        Ok(())
    }
}
