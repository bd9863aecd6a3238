//! Error types for quadrature inputs.

use thiserror::Error;

/// Result type for quadrature operations.
pub type QuadratureResult<T> = Result<T, InvalidInputError>;

/// Every quadrature failure is an input problem: the rules are pure and have no
/// transient failure modes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    /// Fewer than two partition points.
    #[error("partition needs at least 2 points, got {len}")]
    TooFewPoints { len: usize },

    /// A partition point is NaN or infinite.
    #[error("partition point {index} is not finite")]
    NonFinitePoint { index: usize },

    /// `points[index] <= points[index - 1]`.
    #[error("partition is not strictly increasing at index {index}")]
    NotIncreasing { index: usize },

    /// Simpson's rule pairs sub-intervals, so their count must be even.
    #[error("Simpson's rule needs an even number of sub-intervals, got {intervals}")]
    OddIntervalCount { intervals: usize },

    /// Simpson's rule was given a partition whose spacing is visibly uneven.
    #[error(
        "partition is not uniform: spacing deviates {deviation:.3e} from the mean (tolerance {tolerance:.3e})"
    )]
    NonUniformSpacing { deviation: f64, tolerance: f64 },

    #[error("a uniform partition needs at least one sub-interval")]
    ZeroIntervals,

    #[error("a uniform partition allows at most {max} sub-intervals, got {intervals}")]
    TooManyIntervals { intervals: usize, max: usize },

    /// Bounds must be finite with `lower < upper`.
    #[error("invalid interval [{lower}, {upper}]: bounds must be finite with lower < upper")]
    InvalidInterval { lower: f64, upper: f64 },

    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("unknown quadrature rule '{name}'")]
    UnknownRule { name: String },
}
