//! Expression-backed integrand wrapper and single-rule integration.

use anyhow::{Context, Result};
use quad_core::expression::ExpressionIntegrand;
use quad_core::{integrate, Integrand, Partition, Rule};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmIntegrand {
    pub(crate) integrand: ExpressionIntegrand<f64>,
}

pub(crate) fn build_integrand(
    expression: &str,
    variable: &str,
    param_names: &[String],
    params: Vec<f64>,
) -> Result<ExpressionIntegrand<f64>> {
    ExpressionIntegrand::compile(expression, variable, param_names, params)
}

pub(crate) fn parse_rule(name: &str) -> Result<Rule> {
    name.parse::<Rule>()
        .with_context(|| "Expected one of left_riemann, right_riemann, trapezoidal, simpson.")
}

pub(crate) fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

#[wasm_bindgen]
impl WasmIntegrand {
    #[wasm_bindgen(constructor)]
    pub fn new(
        expression: &str,
        variable: &str,
        param_names: Vec<String>,
        params: Vec<f64>,
    ) -> Result<WasmIntegrand, JsValue> {
        console_error_panic_hook::set_once();

        let integrand =
            build_integrand(expression, variable, &param_names, params).map_err(to_js_error)?;
        Ok(WasmIntegrand { integrand })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.integrand.evaluate(x)
    }

    pub fn sample(&self, points: &[f64]) -> Vec<f64> {
        self.integrand.sample(points)
    }

    /// Integrates over caller-supplied sample points.
    pub fn integrate(&self, rule: &str, points: Vec<f64>) -> Result<f64, JsValue> {
        self.integrate_points(rule, &points).map_err(to_js_error)
    }

    /// Integrates over `intervals` equal sub-intervals of `[lower, upper]`.
    pub fn integrate_uniform(
        &self,
        rule: &str,
        lower: f64,
        upper: f64,
        intervals: u32,
    ) -> Result<f64, JsValue> {
        self.integrate_interval(rule, lower, upper, intervals as usize)
            .map_err(to_js_error)
    }
}

impl WasmIntegrand {
    pub(crate) fn integrate_points(&self, rule: &str, points: &[f64]) -> Result<f64> {
        let rule = parse_rule(rule)?;
        Ok(integrate(rule, &self.integrand, points)?)
    }

    pub(crate) fn integrate_interval(
        &self,
        rule: &str,
        lower: f64,
        upper: f64,
        intervals: usize,
    ) -> Result<f64> {
        let rule = parse_rule(rule)?;
        let h = Partition::uniform(lower, upper, intervals)?;
        Ok(rule.integrate(&self.integrand, &h)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrand(expression: &str) -> WasmIntegrand {
        WasmIntegrand::new(expression, "x", Vec::new(), Vec::new()).expect("integrand")
    }

    #[test]
    #[cfg(target_arch = "wasm32")]
    fn new_rejects_invalid_expression() {
        let result = WasmIntegrand::new("1 +", "x", Vec::new(), Vec::new());
        assert!(result.is_err(), "expected parse error for invalid expression");
    }

    #[test]
    fn build_integrand_rejects_unknown_symbol() {
        let err = build_integrand("x + y", "x", &[], Vec::new())
            .expect_err("unknown symbol should fail");
        assert!(err.to_string().contains("Unknown variable"));
    }

    #[test]
    fn evaluate_uses_parameters() {
        let f = WasmIntegrand::new(
            "k * t",
            "t",
            vec!["k".to_string()],
            vec![3.0],
        )
        .expect("integrand should build");
        assert_eq!(f.evaluate(2.0), 6.0);
        assert_eq!(f.sample(&[0.0, 1.0]), vec![0.0, 3.0]);
    }

    #[test]
    fn integrate_uniform_matches_exact_values() {
        let f = integrand("x^2");
        let value = f.integrate_uniform("simpson", 0.0, 1.0, 10).expect("simpson");
        assert!((value - 1.0 / 3.0).abs() < 1e-14);

        let f = integrand("x");
        let value = f.integrate_uniform("trapezoid", 0.0, 1.0, 7).expect("trapezoid");
        assert!((value - 0.5).abs() < 1e-14);
    }

    #[test]
    fn integrate_points_accepts_irregular_partitions() {
        let f = integrand("2");
        let value = f
            .integrate(
                "left_riemann",
                vec![0.0, 0.1, 0.7, 1.5],
            )
            .expect("left sum");
        assert!((value - 3.0).abs() < 1e-14);
    }

    #[test]
    fn inner_helpers_report_invalid_input() {
        let f = integrand("x");
        let err = f
            .integrate_points("simpson", &[0.0, 1.0])
            .expect_err("odd interval count");
        assert!(err.to_string().contains("even number"));

        let err = f
            .integrate_points("midpoint", &[0.0, 1.0])
            .expect_err("unknown rule");
        assert!(format!("{err:#}").contains("midpoint"));

        assert!(f.integrate_interval("left", 1.0, 0.0, 4).is_err());

        let err = f
            .integrate_interval("left", 0.0, 1.0, u32::MAX as usize)
            .expect_err("resolution above the cap");
        assert!(err.to_string().contains("at most"));
    }
}
