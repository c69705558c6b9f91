//! Error types for the roughness library.
//!
//! This module provides error handling using the `thiserror` crate, with
//! specific variants for dataset validation, coding, least-squares fitting and
//! bounded optimisation.

use thiserror::Error;

/// The main error type for the roughness library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ============ Dataset Errors ============
    /// The observation table is malformed.
    #[error("invalid dataset: {message}")]
    InvalidDataset {
        /// Description of what is wrong, including the offending line or row.
        message: String,
    },

    // ============ Parameter Validation Errors ============
    /// Invalid parameters passed to an operation.
    #[error("invalid parameters: {message}")]
    InvalidParams {
        /// Description of what is invalid.
        message: String,
    },

    /// A factor coding cannot be inverted.
    #[error(
        "invalid coding (center {center}, half-range {half_range}): \
         both must be finite and the half-range non-zero"
    )]
    InvalidCoding {
        /// The rejected center.
        center: f64,
        /// The rejected half-range.
        half_range: f64,
    },

    // ============ Dimension Errors ============
    /// Array dimensions are inconsistent.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension description.
        expected: String,
        /// Actual dimension description.
        actual: String,
    },

    // ============ Fitting Errors ============
    /// The design matrix does not have full column rank.
    #[error("design matrix is rank deficient: rank {rank} < {required} columns")]
    RankDeficient {
        /// Numerical rank found by the SVD.
        rank: usize,
        /// Number of columns that must be independent.
        required: usize,
    },

    /// The SVD solve failed or produced non-finite coefficients.
    #[error("least-squares solve failed: {message}")]
    SolveFailed {
        /// Description of the failure.
        message: String,
    },

    /// A statistic is undefined for the given data.
    #[error("undefined statistic: {message}")]
    Undefined {
        /// Description of why the statistic cannot be computed.
        message: String,
    },

    // ============ Optimisation Errors ============
    /// The start point lies outside the feasible box.
    #[error("start point {point:?} lies outside the feasible box")]
    InfeasibleStart {
        /// The rejected start point.
        point: [f64; 3],
    },

    /// The minimiser did not reach the gradient tolerance.
    #[error(
        "optimizer did not converge after {iterations} iterations \
         (projected gradient {gradient_norm:e})"
    )]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Infinity norm of the final projected gradient.
        gradient_norm: f64,
    },
}

/// A specialized `Result` type for roughness operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Create a new `InvalidDataset` error.
    #[must_use]
    pub fn invalid_dataset(message: impl Into<String>) -> Self {
        Self::InvalidDataset {
            message: message.into(),
        }
    }

    /// Create a new `InvalidParams` error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a new `SolveFailed` error.
    #[must_use]
    pub fn solve_failed(message: impl Into<String>) -> Self {
        Self::SolveFailed {
            message: message.into(),
        }
    }

    /// Create a new `Undefined` error.
    #[must_use]
    pub fn undefined(message: impl Into<String>) -> Self {
        Self::Undefined {
            message: message.into(),
        }
    }
}
