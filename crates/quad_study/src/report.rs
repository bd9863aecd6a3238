//! Table writers.

use std::io::Write;

use anyhow::Result;
use quad_core::convergence::ConvergenceTable;
use quad_core::Rule;
use serde::Serialize;

use crate::config::OutputFormat;

#[derive(Debug, Serialize)]
struct RuleSummary {
    rule: Rule,
    theoretical_order: u32,
    observed_order: Option<f64>,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    table: &'a ConvergenceTable,
    summary: Vec<RuleSummary>,
}

pub fn write_report<W: Write>(
    mut w: W,
    format: OutputFormat,
    table: &ConvergenceTable,
    rules: &[Rule],
) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(&mut w, table)?,
        OutputFormat::Json => {
            let summary = rules
                .iter()
                .map(|&rule| RuleSummary {
                    rule,
                    theoretical_order: rule.order(),
                    observed_order: table.observed_order(rule),
                })
                .collect();
            serde_json::to_writer_pretty(&mut w, &JsonReport { table, summary })?;
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(())
}

/// One row per computed sample; skipped pairs are left out.
pub fn write_csv<W: Write>(w: &mut W, table: &ConvergenceTable) -> std::io::Result<()> {
    writeln!(w, "rule,intervals,estimate,abs_error")?;
    for s in &table.samples {
        writeln!(
            w,
            "{},{},{:.17e},{:.6e}",
            s.rule, s.intervals, s.estimate, s.abs_error
        )?;
    }
    Ok(())
}
