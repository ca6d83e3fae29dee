//! Check command implementation.

use anyhow::{Context, Result};
use gostable::Analyzer;
use gostable_core::{RuleId, Severity};
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Flags of `gostable check`.
pub struct CheckOptions {
    /// Output format.
    pub format: OutputFormat,
    /// Comma-separated rule names or codes.
    pub rules: Option<String>,
    /// Extra exclude patterns.
    pub exclude: Vec<String>,
    /// Failure threshold overriding `fail_on`.
    pub fail_on: Option<Severity>,
}

/// Runs the check command.
pub fn run(path: &Path, options: &CheckOptions, source: &ConfigSource) -> Result<()> {
    let config = source.load()?;

    let mut builder = Analyzer::builder()
        .root(path)
        .config(config)
        .excludes(options.exclude.iter().cloned());

    if let Some(filter) = &options.rules {
        builder = builder.rules(parse_rules(filter));
    }

    let analyzer = builder.build().context("Failed to build analyzer")?;
    let threshold = options.fail_on.unwrap_or_else(|| analyzer.fail_threshold());

    tracing::info!("Analyzing {}", analyzer.root().display());

    let result = analyzer.analyze().context("Analysis failed")?;

    super::output::print(&result, options.format, analyzer.root())?;

    if result.has_violations_at(threshold) {
        std::process::exit(1);
    }

    Ok(())
}

fn parse_rules(filter: &str) -> Vec<RuleId> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match name.parse::<RuleId>() {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::warn!("{e}");
                None
            }
        })
        .collect()
}
