//! # quad_study
//!
//! Convergence studies for the `quad_core` rules: sweep partition resolution,
//! tabulate `|estimate - exact|`, and fit the observed order of each rule.
//! Output is CSV or JSON, ready for an external plotting tool.

pub mod config;
pub mod report;
