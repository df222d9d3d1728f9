//! Error types returned by the public estimation entry points.
//!
//! Only input validation is fallible. Invariant violations inside the trees
//! are programmer errors and assert instead; degenerate match counts are not
//! errors at all and surface as an infinite entropy on the outcome.

use thiserror::Error;

/// Errors detected while validating an estimation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampenError {
    /// The signal is too short to extract two templates of length `m + 1`.
    #[error("input of length {n} is too short for template length {m} (need at least m + 2 samples)")]
    ShortInput {
        /// Length of the offending signal.
        n: usize,
        /// Requested template length.
        m: u32,
    },

    /// The similarity threshold was negative.
    #[error("similarity threshold must be non-negative")]
    InvalidThreshold,

    /// The template length was outside the supported `[1, 10]` range.
    #[error("template length {m} is unsupported (must be in [1, 10])")]
    InvalidDimension {
        /// Requested template length.
        m: u32,
    },

    /// A sampling request asked for zero samples, or for more distinct
    /// templates than the signal provides.
    #[error("sample size {sample_size} is invalid for {n_templates} templates")]
    InvalidSampleSize {
        /// Requested per-sample size (N0).
        sample_size: usize,
        /// Number of templates available to draw from.
        n_templates: usize,
    },
}
