//! # quad-study
//!
//! Runs a convergence study and writes the error table.
//!
//! ## Usage
//!
//! ```text
//! quad-study                                    # sin(x) on [-pi/2, pi/2]
//! quad-study --expression "exp(x)" --lower 0 --upper 1 --exact "e - 1" \
//!            --resolutions 2,4,8,16,32,64 --format json --output exp.json
//! quad-study --config study.json --rules simpson,trapezoidal
//! ```
//!
//! Logs go to stderr; `RUST_LOG` takes precedence over `--log-level`.

use std::fs::File;
use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use quad_core::convergence::convergence_study;
use quad_study::config::Cli;
use quad_study::report::write_report;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = cli.study_config()?;
    let integrand = config.integrand()?;
    let settings = config.settings()?;

    info!(
        expression = %config.expression,
        lower = settings.lower,
        upper = settings.upper,
        exact = settings.exact,
        resolutions = settings.resolutions.len(),
        "Starting convergence study"
    );

    let table = convergence_study(&integrand, &settings)?;

    for &rule in &settings.rules {
        info!(
            %rule,
            theoretical = rule.order(),
            observed = ?table.observed_order(rule),
            "Observed order"
        );
    }
    if !table.skipped.is_empty() {
        warn!(
            skipped = table.skipped.len(),
            "Some rule/resolution pairs were skipped (Simpson needs an even count)"
        );
    }

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_report(BufWriter::new(file), cli.format, &table, &settings.rules)?;
            info!(path = %path.display(), "Table written");
        }
        None => write_report(io::stdout().lock(), cli.format, &table, &settings.rules)?,
    }

    Ok(())
}
