//! Environment-driven overrides for conversion limits
//!
//! Missing or unparsable values are never an error: the caller falls back to
//! the built-in default and the reason is logged at debug level.

pub const MAX_PROCESSING_MS_VAR: &str = "ICOSMITH_MAX_PROCESSING_MS";
pub const MAX_MEMORY_MB_VAR: &str = "ICOSMITH_MAX_MEMORY_MB";
pub const MAX_SOURCE_DIMENSION_VAR: &str = "ICOSMITH_MAX_SOURCE_DIMENSION";

/// Read a positive integer setting from the environment.
pub fn read_u64(name: &str) -> Option<u64> {
    let raw = match std::env::var(name) {
        Ok(raw) => raw,
        Err(_) => return None,
    };
    parse_positive(&raw).or_else(|| {
        tracing::debug!("Ignoring {}={:?}: expected a positive integer", name, raw);
        None
    })
}

fn parse_positive(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(value) => Some(value),
    }
}
