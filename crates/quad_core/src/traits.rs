use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the quadrature rules.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A real-valued function of one real variable.
///
/// Quadrature rules only ever evaluate an integrand at partition points, so
/// implementations are free to keep scratch buffers behind interior mutability.
pub trait Integrand<T: Scalar> {
    /// Evaluates the integrand at `x`.
    fn evaluate(&self, x: T) -> T;

    /// Evaluates the integrand at every point, elementwise.
    fn sample(&self, points: &[T]) -> Vec<T> {
        points.iter().map(|&x| self.evaluate(x)).collect()
    }
}

impl<T: Scalar, F: Fn(T) -> T + ?Sized> Integrand<T> for F {
    fn evaluate(&self, x: T) -> T {
        self(x)
    }
}

/// Converts an `f64` literal into the scalar type.
///
/// Every `Scalar` is a `Float`, so `f64` literals always have a (possibly
/// rounded) representation.
pub(crate) fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}
