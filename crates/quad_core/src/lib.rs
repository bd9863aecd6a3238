/// The `quad_core` crate implements classical fixed-partition quadrature:
/// left and right Riemann sums, the trapezoidal rule and Simpson's rule.
/// Everything numeric is generic over `Scalar` (`f32` or `f64`).
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `Integrand` (functions being integrated).
/// - **Partition**: validated, strictly increasing sample points.
/// - **Rules**: the four quadrature rules and the `Rule` selector.
/// - **Expression**: integrands written as text, compiled for a small stack VM.
/// - **Convergence**: resolution sweeps producing error tables and observed orders.
pub mod convergence;
pub mod error;
pub mod expression;
pub mod partition;
pub mod rules;
pub mod traits;

pub use error::{InvalidInputError, QuadratureResult};
pub use partition::{Partition, MAX_INTERVALS};
pub use rules::{
    integrate, left_riemann, right_riemann, simpson, simpson_with, trapezoidal, Rule,
    SimpsonSettings,
};
pub use traits::{Integrand, Scalar};
