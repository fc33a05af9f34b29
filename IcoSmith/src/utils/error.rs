//! Error types for IcoSmith
//!
//! Every failure inside a conversion aborts the whole batch, so callers only
//! ever see one of these. `IcoError::kind()` gives a stable identity per
//! category for mapping onto user-facing messages.

use std::fmt;
use thiserror::Error;

/// Which configured ceiling a [`IcoError::ResourceLimit`] tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// Cumulative estimated bytes of live pixel buffers and payloads
    MemoryBudget,
    /// Decoded source width or height
    SourceDimensions,
    /// Raw input byte length
    SourceBytes,
    /// Destination canvas byte size for one target size
    CanvasSize,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemoryBudget => "memory budget",
            Self::SourceDimensions => "source dimensions",
            Self::SourceBytes => "source file size",
            Self::CanvasSize => "canvas size",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable, comparable identity of an [`IcoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    ResourceLimit,
    Timeout,
    Busy,
    Encoding,
    InvalidInput,
    Io,
}

#[derive(Error, Debug)]
pub enum IcoError {
    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Resource limit exceeded ({limit}): {detail}")]
    ResourceLimit { limit: LimitKind, detail: String },

    #[error("Processing timed out after {elapsed_ms} ms (budget {budget_ms} ms)")]
    Timeout { elapsed_ms: u128, budget_ms: u128 },

    #[error("A conversion is already in progress")]
    Busy,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IcoError {
    pub(crate) fn limit(limit: LimitKind, detail: impl Into<String>) -> Self {
        Self::ResourceLimit {
            limit,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::ResourceLimit { .. } => ErrorKind::ResourceLimit,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Busy => ErrorKind::Busy,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Busy is the only category worth retrying unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

pub type Result<T> = std::result::Result<T, IcoError>;
