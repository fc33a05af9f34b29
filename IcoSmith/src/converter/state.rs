//! Busy gate: at most one conversion in flight per converter
//!
//! The gate is an explicit value owned by a [`Converter`](super::Converter)
//! and shared by its clones. Acquiring it returns a [`GateGuard`]; dropping
//! the guard reopens the gate on every exit path, including errors and
//! panics unwinding through the pipeline.

use crate::utils::error::{IcoError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether a conversion is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Default)]
pub struct ConversionGate {
    running: Arc<AtomicBool>,
}

impl ConversionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConversionState {
        if self.running.load(Ordering::Acquire) {
            ConversionState::Running
        } else {
            ConversionState::Idle
        }
    }

    /// Enter the gate or fail immediately with [`IcoError::Busy`].
    pub fn try_acquire(&self) -> Result<GateGuard> {
        match self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                tracing::debug!("Conversion gate acquired");
                Ok(GateGuard {
                    running: Arc::clone(&self.running),
                })
            }
            Err(_) => {
                tracing::warn!("Rejecting conversion: another one is in progress");
                Err(IcoError::Busy)
            }
        }
    }
}

/// Holds the gate closed until dropped. `Send`, so it can move to a worker.
#[derive(Debug)]
pub struct GateGuard {
    running: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        tracing::debug!("Conversion gate released");
    }
}
