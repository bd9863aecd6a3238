use crate::error::{InvalidInputError, QuadratureResult};
use crate::partition::Partition;
use crate::traits::{lit, Integrand, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Left Riemann sum: `sum (x[i+1] - x[i]) * f(x[i])`.
pub fn left_riemann<T, F>(f: &F, h: &Partition<T>) -> T
where
    T: Scalar,
    F: Integrand<T> + ?Sized,
{
    let values = f.sample(h.points());
    h.spacings()
        .zip(&values)
        .fold(T::zero(), |acc, (dx, &y)| acc + dx * y)
}

/// Right Riemann sum: `sum (x[i+1] - x[i]) * f(x[i+1])`.
pub fn right_riemann<T, F>(f: &F, h: &Partition<T>) -> T
where
    T: Scalar,
    F: Integrand<T> + ?Sized,
{
    let values = f.sample(h.points());
    h.spacings()
        .zip(&values[1..])
        .fold(T::zero(), |acc, (dx, &y)| acc + dx * y)
}

/// Composite trapezoidal rule: `sum 0.5 * (x[i+1] - x[i]) * (f(x[i]) + f(x[i+1]))`.
pub fn trapezoidal<T, F>(f: &F, h: &Partition<T>) -> T
where
    T: Scalar,
    F: Integrand<T> + ?Sized,
{
    let half = lit::<T>(0.5);
    let values = f.sample(h.points());
    h.spacings()
        .zip(values.windows(2))
        .fold(T::zero(), |acc, (dx, y)| acc + half * dx * (y[0] + y[1]))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimpsonSettings {
    /// Largest accepted deviation of any spacing from the average spacing,
    /// relative to the average spacing.
    pub uniformity_tolerance: f64,
}

impl Default for SimpsonSettings {
    fn default() -> Self {
        Self {
            uniformity_tolerance: 1e-6,
        }
    }
}

/// Composite Simpson's 1/3 rule with default settings.
pub fn simpson<T, F>(f: &F, h: &Partition<T>) -> QuadratureResult<T>
where
    T: Scalar,
    F: Integrand<T> + ?Sized,
{
    simpson_with(f, h, SimpsonSettings::default())
}

/// Composite Simpson's 1/3 rule.
///
/// The weights assume equal spacing. The average spacing stands in for the exact
/// one so linspace rounding is tolerated, but a partition whose spacings stray
/// further than `settings.uniformity_tolerance` from the mean is rejected.
///
/// Linspace points carry about one ulp of the largest endpoint each, so the
/// accepted relative deviation never drops below
/// `8 * eps * max(|start|, |end|) / average_spacing`.
pub fn simpson_with<T, F>(f: &F, h: &Partition<T>, settings: SimpsonSettings) -> QuadratureResult<T>
where
    T: Scalar,
    F: Integrand<T> + ?Sized,
{
    let tolerance = settings.uniformity_tolerance;
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(InvalidInputError::InvalidSetting {
            name: "uniformity_tolerance",
            reason: format!("must be finite and non-negative, got {tolerance}"),
        });
    }

    let intervals = h.intervals();
    if intervals % 2 != 0 {
        return Err(InvalidInputError::OddIntervalCount { intervals });
    }

    let average_spacing = h.average_spacing();
    let magnitude = h.start().abs().max(h.end().abs());
    let rounding = lit::<T>(8.0) * T::epsilon() * magnitude / average_spacing;
    let limit = lit::<T>(tolerance).max(rounding);
    let deviation = h.max_spacing_deviation() / average_spacing;
    if deviation > limit {
        let deviation = deviation.to_f64().unwrap_or(f64::NAN);
        let tolerance = limit.to_f64().unwrap_or(tolerance);
        tracing::debug!(deviation, tolerance, "Simpson's rule rejected a non-uniform partition");
        return Err(InvalidInputError::NonUniformSpacing {
            deviation,
            tolerance,
        });
    }

    let values = f.sample(h.points());
    let last = values.len() - 1;

    let (even, odd) = values[1..last]
        .iter()
        .enumerate()
        .fold((T::zero(), T::zero()), |(even, odd), (offset, &y)| {
            // offset 0 is index 1, which is odd.
            if offset % 2 == 0 {
                (even, odd + y)
            } else {
                (even + y, odd)
            }
        });

    let two = lit::<T>(2.0);
    let three = lit::<T>(3.0);
    let four = lit::<T>(4.0);
    Ok(average_spacing / three * (values[0] + two * even + four * odd + values[last]))
}

/// The fixed-partition quadrature rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    LeftRiemann,
    RightRiemann,
    Trapezoidal,
    Simpson,
}

impl Rule {
    pub const ALL: [Rule; 4] = [
        Rule::LeftRiemann,
        Rule::RightRiemann,
        Rule::Trapezoidal,
        Rule::Simpson,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::LeftRiemann => "left_riemann",
            Rule::RightRiemann => "right_riemann",
            Rule::Trapezoidal => "trapezoidal",
            Rule::Simpson => "simpson",
        }
    }

    /// Theoretical order p of the error `O(n^-p)` for smooth integrands.
    pub fn order(&self) -> u32 {
        match self {
            Rule::LeftRiemann | Rule::RightRiemann => 1,
            Rule::Trapezoidal => 2,
            Rule::Simpson => 4,
        }
    }

    /// Whether the rule accepts a partition with this many sub-intervals.
    pub fn supports(&self, intervals: usize) -> bool {
        match self {
            Rule::Simpson => intervals > 0 && intervals % 2 == 0,
            _ => intervals > 0,
        }
    }

    pub fn integrate<T, F>(&self, f: &F, h: &Partition<T>) -> QuadratureResult<T>
    where
        T: Scalar,
        F: Integrand<T> + ?Sized,
    {
        match self {
            Rule::LeftRiemann => Ok(left_riemann(f, h)),
            Rule::RightRiemann => Ok(right_riemann(f, h)),
            Rule::Trapezoidal => Ok(trapezoidal(f, h)),
            Rule::Simpson => simpson(f, h),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rule {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "left" | "left_riemann" => Ok(Rule::LeftRiemann),
            "right" | "right_riemann" => Ok(Rule::RightRiemann),
            "trapezoid" | "trapezoidal" | "trapz" => Ok(Rule::Trapezoidal),
            "simpson" | "simps" => Ok(Rule::Simpson),
            _ => Err(InvalidInputError::UnknownRule {
                name: s.to_string(),
            }),
        }
    }
}

/// Validates raw sample points and applies `rule` to them.
pub fn integrate<T, F>(rule: Rule, f: &F, points: &[T]) -> QuadratureResult<T>
where
    T: Scalar,
    F: Integrand<T> + ?Sized,
{
    let h = Partition::new(points.to_vec())?;
    rule.integrate(f, &h)
}
