//! Resolution sweeps: run each rule on a family of uniform partitions and
//! tabulate the absolute error against a known exact value.

use crate::error::{InvalidInputError, QuadratureResult};
use crate::partition::{Partition, MAX_INTERVALS};
use crate::rules::Rule;
use crate::traits::Integrand;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Errors at or below this are treated as exact and left out of order fits.
const ERROR_FLOOR: f64 = 1e-14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    pub lower: f64,
    pub upper: f64,
    /// Exact value of the integral over `[lower, upper]`.
    pub exact: f64,
    /// Sub-interval counts to sweep.
    pub resolutions: Vec<usize>,
    pub rules: Vec<Rule>,
}

impl Default for ConvergenceSettings {
    /// `sin(x)` over `[-pi/2, pi/2]`, whose integral is zero.
    fn default() -> Self {
        Self {
            lower: -FRAC_PI_2,
            upper: FRAC_PI_2,
            exact: 0.0,
            resolutions: (1..=10).map(|k| 1usize << k).collect(),
            rules: Rule::ALL.to_vec(),
        }
    }
}

impl ConvergenceSettings {
    pub fn validate(&self) -> QuadratureResult<()> {
        if !self.lower.is_finite() || !self.upper.is_finite() || self.upper <= self.lower {
            return Err(InvalidInputError::InvalidInterval {
                lower: self.lower,
                upper: self.upper,
            });
        }
        if !self.exact.is_finite() {
            return Err(InvalidInputError::InvalidSetting {
                name: "exact",
                reason: format!("must be finite, got {}", self.exact),
            });
        }
        if self.resolutions.is_empty() {
            return Err(InvalidInputError::InvalidSetting {
                name: "resolutions",
                reason: "at least one resolution is required".to_string(),
            });
        }
        if self.resolutions.contains(&0) {
            return Err(InvalidInputError::InvalidSetting {
                name: "resolutions",
                reason: "resolutions must be positive".to_string(),
            });
        }
        if let Some(&intervals) = self.resolutions.iter().find(|&&n| n > MAX_INTERVALS) {
            return Err(InvalidInputError::TooManyIntervals {
                intervals,
                max: MAX_INTERVALS,
            });
        }
        if self.rules.is_empty() {
            return Err(InvalidInputError::InvalidSetting {
                name: "rules",
                reason: "at least one rule is required".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSample {
    pub rule: Rule,
    pub intervals: usize,
    pub estimate: f64,
    pub abs_error: f64,
}

/// A rule/resolution pair the rule cannot accept (Simpson with odd `n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSample {
    pub rule: Rule,
    pub intervals: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceTable {
    pub samples: Vec<ConvergenceSample>,
    pub skipped: Vec<SkippedSample>,
}

impl ConvergenceTable {
    /// `(intervals, abs_error)` pairs for one rule, in sweep order.
    pub fn errors(&self, rule: Rule) -> Vec<(usize, f64)> {
        self.samples
            .iter()
            .filter(|s| s.rule == rule)
            .map(|s| (s.intervals, s.abs_error))
            .collect()
    }

    /// Empirical order `p` in `error ~ C * n^-p`: the negated least-squares
    /// slope of `ln(error)` against `ln(n)`.
    ///
    /// Samples at the rounding floor are ignored. Returns `None` when fewer than
    /// two distinct resolutions remain.
    pub fn observed_order(&self, rule: Rule) -> Option<f64> {
        let logs: Vec<(f64, f64)> = self
            .errors(rule)
            .into_iter()
            .filter(|&(_, err)| err > ERROR_FLOOR)
            .map(|(n, err)| ((n as f64).ln(), err.ln()))
            .collect();
        if logs.len() < 2 {
            return None;
        }

        let count = logs.len() as f64;
        let mean_x = logs.iter().map(|(x, _)| x).sum::<f64>() / count;
        let mean_y = logs.iter().map(|(_, y)| y).sum::<f64>() / count;
        let sxx: f64 = logs.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        if sxx == 0.0 {
            return None;
        }
        let sxy: f64 = logs
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        Some(-sxy / sxx)
    }
}

/// Runs every requested rule at every requested resolution.
pub fn convergence_study<F>(f: &F, settings: &ConvergenceSettings) -> QuadratureResult<ConvergenceTable>
where
    F: Integrand<f64> + ?Sized,
{
    settings.validate()?;

    let mut table = ConvergenceTable::default();
    for &intervals in &settings.resolutions {
        let h = Partition::uniform(settings.lower, settings.upper, intervals)?;
        for &rule in &settings.rules {
            if !rule.supports(intervals) {
                tracing::debug!(%rule, intervals, "Rule does not accept this resolution, skipping");
                table.skipped.push(SkippedSample { rule, intervals });
                continue;
            }
            let estimate = rule.integrate(f, &h)?;
            let abs_error = (estimate - settings.exact).abs();
            tracing::debug!(%rule, intervals, estimate, abs_error, "Sample computed");
            table.samples.push(ConvergenceSample {
                rule,
                intervals,
                estimate,
                abs_error,
            });
        }
    }

    Ok(table)
}
