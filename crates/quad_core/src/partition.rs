use crate::error::{InvalidInputError, QuadratureResult};
use crate::traits::{lit, Scalar};
use serde::Serialize;

/// Largest sub-interval count [`Partition::uniform`] will allocate.
pub const MAX_INTERVALS: usize = 1 << 24;

/// An ordered set of sample points `x_0 < x_1 < ... < x_n` spanning an
/// integration interval.
///
/// The invariants (at least two points, all finite, strictly increasing) are
/// checked once at construction, so the rules can sum without re-validating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Partition<T: Scalar> {
    points: Vec<T>,
}

impl<T: Scalar> Partition<T> {
    pub fn new(points: Vec<T>) -> QuadratureResult<Self> {
        if points.len() < 2 {
            return Err(InvalidInputError::TooFewPoints { len: points.len() });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(InvalidInputError::NonFinitePoint { index });
        }
        if let Some(offset) = points.windows(2).position(|w| w[1] <= w[0]) {
            return Err(InvalidInputError::NotIncreasing { index: offset + 1 });
        }
        Ok(Self { points })
    }

    /// Evenly spaced points over `[lower, upper]` with `intervals` sub-intervals.
    /// The final point is exactly `upper`. At most [`MAX_INTERVALS`] sub-intervals.
    pub fn uniform(lower: T, upper: T, intervals: usize) -> QuadratureResult<Self> {
        if intervals == 0 {
            return Err(InvalidInputError::ZeroIntervals);
        }
        if intervals > MAX_INTERVALS {
            return Err(InvalidInputError::TooManyIntervals {
                intervals,
                max: MAX_INTERVALS,
            });
        }
        if !lower.is_finite() || !upper.is_finite() || upper <= lower {
            return Err(InvalidInputError::InvalidInterval {
                lower: lower.to_f64().unwrap_or(f64::NAN),
                upper: upper.to_f64().unwrap_or(f64::NAN),
            });
        }

        let n = lit::<T>(intervals as f64);
        let span = upper - lower;
        let mut points: Vec<T> = (0..intervals)
            .map(|i| lower + span * (lit::<T>(i as f64) / n))
            .collect();
        points.push(upper);

        // Tiny spans in low precision can collapse neighbouring points.
        Self::new(points)
    }

    pub fn points(&self) -> &[T] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: a partition holds at least two points.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of sub-intervals, `len() - 1`.
    pub fn intervals(&self) -> usize {
        self.points.len() - 1
    }

    pub fn start(&self) -> T {
        self.points[0]
    }

    pub fn end(&self) -> T {
        self.points[self.points.len() - 1]
    }

    pub fn span(&self) -> T {
        self.end() - self.start()
    }

    pub fn spacings(&self) -> impl Iterator<Item = T> + '_ {
        self.points.windows(2).map(|w| w[1] - w[0])
    }

    /// Mean sub-interval width. The spacings telescope, so this is `span / n`.
    pub fn average_spacing(&self) -> T {
        self.span() / lit::<T>(self.intervals() as f64)
    }

    /// Largest absolute difference between a spacing and the average spacing.
    pub fn max_spacing_deviation(&self) -> T {
        let mean = self.average_spacing();
        self.spacings()
            .map(|dx| (dx - mean).abs())
            .fold(T::zero(), T::max)
    }

    /// True when every spacing is within `rel_tol * average_spacing()` of the mean.
    pub fn is_uniform(&self, rel_tol: T) -> bool {
        self.max_spacing_deviation() <= rel_tol * self.average_spacing()
    }
}

impl<T: Scalar> TryFrom<Vec<T>> for Partition<T> {
    type Error = InvalidInputError;

    fn try_from(points: Vec<T>) -> QuadratureResult<Self> {
        Self::new(points)
    }
}

impl<T: Scalar> AsRef<[T]> for Partition<T> {
    fn as_ref(&self) -> &[T] {
        &self.points
    }
}
