//! Error type shared by every stage.
//!
//! There is no partial success: a stage either returns its full output or
//! one of these errors, and nothing has been written to caller-visible state.

use thiserror::Error;

/// Errors reported by the projection, shading, covariance and sorting stages.
#[derive(Debug, Error)]
pub enum SplatError {
    /// An input array or matrix does not have the expected length.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A scalar argument is out of its valid domain (zero image size, SH degree too high, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Inputs disagree with each other in a way that indicates an upstream bug,
    /// e.g. a tile-overlap count that does not match the emitted keys.
    #[error("internal consistency fault: {0}")]
    InternalFault(String),

    /// A camera or settings document failed to parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SplatError>;

/// Check that `actual` equals `expected`, naming the offending input.
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SplatError::ShapeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
