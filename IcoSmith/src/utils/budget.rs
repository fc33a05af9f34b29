//! Memory budget accounting for one conversion
//!
//! Every pixel buffer and encoded payload the pipeline allocates first takes
//! a [`BudgetLease`] for its estimated size. Leases hand their bytes back on
//! drop, so the running total only counts buffers that are still alive, on
//! success and error paths alike.

use crate::utils::error::{IcoError, LimitKind, Result};
use std::cell::Cell;

/// Estimated bytes of an RGBA8 buffer.
pub fn rgba_bytes(width: u32, height: u32) -> u64 {
    (width as u64) * (height as u64) * 4
}

/// Byte-size tracker scoped to a single conversion.
#[derive(Debug)]
pub struct MemoryBudget {
    limit: u64,
    used: Cell<u64>,
    peak: Cell<u64>,
}

impl MemoryBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    /// Reserve `bytes` for the buffer named by `what`.
    ///
    /// Fails before anything is allocated if the reservation would push the
    /// live total past the limit.
    pub fn reserve(&self, bytes: u64, what: &str) -> Result<BudgetLease<'_>> {
        let used = self.used.get();
        let next = used.saturating_add(bytes);
        if next > self.limit {
            tracing::warn!(
                "Memory budget exceeded reserving {} bytes for {} ({} of {} in use)",
                bytes,
                what,
                used,
                self.limit
            );
            return Err(IcoError::limit(
                LimitKind::MemoryBudget,
                format!(
                    "{} needs {:.2} MB with {:.2} MB already in use (limit {:.2} MB)",
                    what,
                    bytes as f64 / 1024.0 / 1024.0,
                    used as f64 / 1024.0 / 1024.0,
                    self.limit as f64 / 1024.0 / 1024.0
                ),
            ));
        }
        self.used.set(next);
        if next > self.peak.get() {
            self.peak.set(next);
        }
        Ok(BudgetLease {
            budget: self,
            bytes,
        })
    }

    /// Reserve room for a `width` x `height` RGBA buffer.
    pub fn reserve_rgba(&self, width: u32, height: u32, what: &str) -> Result<BudgetLease<'_>> {
        self.reserve(rgba_bytes(width, height), what)
    }

    pub fn used(&self) -> u64 {
        self.used.get()
    }

    pub fn peak(&self) -> u64 {
        self.peak.get()
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    fn release(&self, bytes: u64) {
        self.used.set(self.used.get().saturating_sub(bytes));
    }
}

/// Scoped reservation against a [`MemoryBudget`].
#[derive(Debug)]
pub struct BudgetLease<'a> {
    budget: &'a MemoryBudget,
    bytes: u64,
}

impl BudgetLease<'_> {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for BudgetLease<'_> {
    fn drop(&mut self) {
        self.budget.release(self.bytes);
    }
}
