//! Convergence study runner.

use crate::integrand::{parse_rule, to_js_error, WasmIntegrand};
use anyhow::Result;
use quad_core::convergence::{convergence_study, ConvergenceSettings, ConvergenceTable};
use quad_core::Rule;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[derive(Debug, Serialize)]
pub(crate) struct RuleOrder {
    rule: Rule,
    theoretical: u32,
    observed: Option<f64>,
}

/// Payload returned to JavaScript: the raw table plus fitted orders per rule.
#[derive(Debug, Serialize)]
pub(crate) struct StudyReport {
    table: ConvergenceTable,
    orders: Vec<RuleOrder>,
}

#[wasm_bindgen]
impl WasmIntegrand {
    /// Sweeps `resolutions` for each rule in `rules` (all rules when empty).
    pub fn convergence_study(
        &self,
        lower: f64,
        upper: f64,
        exact: f64,
        resolutions: Vec<u32>,
        rules: Vec<String>,
    ) -> Result<JsValue, JsValue> {
        let report = self
            .run_study(lower, upper, exact, &resolutions, &rules)
            .map_err(to_js_error)?;
        to_value(&report)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize study: {e}")))
    }
}

impl WasmIntegrand {
    pub(crate) fn run_study(
        &self,
        lower: f64,
        upper: f64,
        exact: f64,
        resolutions: &[u32],
        rules: &[String],
    ) -> Result<StudyReport> {
        let rules = if rules.is_empty() {
            Rule::ALL.to_vec()
        } else {
            rules
                .iter()
                .map(|name| parse_rule(name))
                .collect::<Result<Vec<_>>>()?
        };

        let settings = ConvergenceSettings {
            lower,
            upper,
            exact,
            resolutions: resolutions.iter().map(|&n| n as usize).collect(),
            rules,
        };
        let table = convergence_study(&self.integrand, &settings)?;

        let orders = settings
            .rules
            .iter()
            .map(|&rule| RuleOrder {
                rule,
                theoretical: rule.order(),
                observed: table.observed_order(rule),
            })
            .collect();

        Ok(StudyReport { table, orders })
    }
}
