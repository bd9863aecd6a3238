//! Study configuration: an optional JSON file, overridden by command-line flags.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use quad_core::convergence::ConvergenceSettings;
use quad_core::expression::{evaluate_constant, ExpressionIntegrand};
use quad_core::Rule;
use serde::{Deserialize, Serialize};

/// Everything needed to run one convergence study.
///
/// Bounds and the exact value are expressions, so `-pi/2` or `e - 1` work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub expression: String,
    pub variable: String,
    pub params: BTreeMap<String, f64>,
    pub lower: String,
    pub upper: String,
    pub exact: String,
    pub resolutions: Vec<usize>,
    pub rules: Vec<Rule>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        let settings = ConvergenceSettings::default();
        Self {
            expression: "sin(x)".to_string(),
            variable: "x".to_string(),
            params: BTreeMap::new(),
            lower: "-pi/2".to_string(),
            upper: "pi/2".to_string(),
            exact: "0".to_string(),
            resolutions: settings.resolutions,
            rules: settings.rules,
        }
    }
}

impl StudyConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn integrand(&self) -> Result<ExpressionIntegrand<f64>> {
        let (names, values): (Vec<String>, Vec<f64>) =
            self.params.iter().map(|(k, v)| (k.clone(), *v)).unzip();
        ExpressionIntegrand::compile(&self.expression, &self.variable, &names, values)
    }

    pub fn settings(&self) -> Result<ConvergenceSettings> {
        let settings = ConvergenceSettings {
            lower: evaluate_constant(&self.lower).context("invalid lower bound")?,
            upper: evaluate_constant(&self.upper).context("invalid upper bound")?,
            exact: evaluate_constant(&self.exact).context("invalid exact value")?,
            resolutions: self.resolutions.clone(),
            rules: self.rules.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "quad-study", version)]
#[command(about = "Tabulates quadrature error against partition resolution")]
pub struct Cli {
    /// JSON file holding a study configuration; flags override its fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Integrand, e.g. "a * exp(-x^2)".
    #[arg(long)]
    pub expression: Option<String>,

    /// Integration variable name.
    #[arg(long)]
    pub variable: Option<String>,

    /// Integrand parameter as name=value; repeatable.
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, f64)>,

    #[arg(long, allow_hyphen_values = true)]
    pub lower: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub upper: Option<String>,

    /// Exact value of the integral.
    #[arg(long, allow_hyphen_values = true)]
    pub exact: Option<String>,

    /// Comma-separated sub-interval counts.
    #[arg(long, value_delimiter = ',')]
    pub resolutions: Option<Vec<usize>>,

    /// Comma-separated rule names.
    #[arg(long, value_delimiter = ',')]
    pub rules: Option<Vec<Rule>>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Output file; stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Tracing filter used when RUST_LOG is unset.
    #[arg(long, env = "QUAD_STUDY_LOG", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Loads the config file (or defaults) and applies flag overrides.
    pub fn study_config(&self) -> Result<StudyConfig> {
        let mut config = match &self.config {
            Some(path) => StudyConfig::from_file(path)?,
            None => StudyConfig::default(),
        };

        if let Some(expression) = &self.expression {
            config.expression = expression.clone();
        }
        if let Some(variable) = &self.variable {
            config.variable = variable.clone();
        }
        for (name, value) in &self.params {
            config.params.insert(name.clone(), *value);
        }
        if let Some(lower) = &self.lower {
            config.lower = lower.clone();
        }
        if let Some(upper) = &self.upper {
            config.upper = upper.clone();
        }
        if let Some(exact) = &self.exact {
            config.exact = exact.clone();
        }
        if let Some(resolutions) = &self.resolutions {
            config.resolutions = resolutions.clone();
        }
        if let Some(rules) = &self.rules {
            config.rules = rules.clone();
        }
        Ok(config)
    }
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let value = evaluate_constant(value).map_err(|e| format!("{e:#}"))?;
    Ok((name.trim().to_string(), value))
}
