use anyhow::Result;
use std::path::PathBuf;

use crate::builders::coverage::{self, Measurement};
use crate::builders::patterns::PathMatcher;
use crate::builders::reporter::{self, ConsoleRenderer, ReportRenderer};
use crate::builders::validator::{ConfigValidator, StandardValidator};
use crate::core::config::{ConfigManager, ConfigProvider, EffectiveConfig, LoadOutcome};
use crate::core::engine::StyleEngine;

// Helper function to create ConfigManager instance
fn get_config_manager(config: Option<PathBuf>) -> Result<ConfigManager> {
    match config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    }
}

/// Loads the configuration and prints the non-fatal warnings (unknown keys
/// and sections) to stderr.
fn load_and_warn(manager: &ConfigManager) -> Result<LoadOutcome> {
    let outcome = manager.load_config()?;
    for warning in &outcome.warnings {
        eprintln!("⚠️  {warning}");
    }
    Ok(outcome)
}

pub fn run_validate(config: Option<PathBuf>) -> Result<()> {
    let manager = get_config_manager(config)?;
    let outcome = load_and_warn(&manager)?;

    let validator = StandardValidator::new();
    let issues = validator.validate_config(&outcome.style, &outcome.coverage)?;

    if issues.is_empty() {
        println!("✓ Configuration is valid.");
        Ok(())
    } else {
        println!("⚠️  Found issues in configuration:");
        for issue in issues {
            println!("  - {issue}");
        }
        anyhow::bail!("Configuration validation failed.");
    }
}

pub fn run_show(config: Option<PathBuf>, format: &str) -> Result<()> {
    let manager = get_config_manager(config)?;
    let outcome = load_and_warn(&manager)?;

    let effective = EffectiveConfig {
        style: outcome.style,
        coverage: outcome.coverage,
    };
    println!("{}", effective.render_as(format)?);
    Ok(())
}

pub fn run_check(config: Option<PathBuf>, paths: &[PathBuf]) -> Result<()> {
    let manager = get_config_manager(config)?;
    let outcome = load_and_warn(&manager)?;
    let engine = StyleEngine::new(outcome.style)?;

    let default_paths = [PathBuf::from(".")];
    let paths = if paths.is_empty() {
        &default_paths[..]
    } else {
        paths
    };

    let mut diagnostics = Vec::new();
    for path in paths {
        diagnostics.extend(engine.check_path(path)?);
    }

    reporter::render_diagnostics(&diagnostics);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Style check failed.");
    }
}

pub fn run_report(config: Option<PathBuf>, artifacts: &[PathBuf]) -> Result<()> {
    let manager = get_config_manager(config)?;
    let outcome = load_and_warn(&manager)?;

    anyhow::ensure!(!artifacts.is_empty(), "no measurement artifacts given");
    if artifacts.len() > 1 && !outcome.coverage.parallel {
        anyhow::bail!(
            "{} measurement artifacts given but `parallel` is not enabled",
            artifacts.len()
        );
    }

    let mut parts = Vec::new();
    for path in artifacts {
        parts.push(Measurement::load(path)?);
    }
    let merged = Measurement::merged(parts);

    let accountings = coverage::account(&merged, &outcome.coverage, manager.root())?;
    let report = reporter::assemble(accountings, &outcome.coverage.report)?;
    ConsoleRenderer::new().render(&report, &outcome.coverage)
}

pub fn run_explain(config: Option<PathBuf>, path: &str) -> Result<()> {
    let manager = get_config_manager(config)?;
    let outcome = load_and_warn(&manager)?;

    let engine = StyleEngine::new(outcome.style)?;
    let omit = PathMatcher::new("omit", &outcome.coverage.report.omit)?;

    println!("🔍 {path}");
    match engine.excluding_pattern(path) {
        Some(pattern) => println!("  style: excluded by `{pattern}`"),
        None => println!(
            "  style: scanned (max line length {})",
            engine.config().max_line_length
        ),
    }
    match omit.matched_pattern(path) {
        Some(pattern) => println!("  coverage report: omitted by `{pattern}`"),
        None if outcome.coverage.is_in_source(path) => {
            println!("  coverage report: included");
        }
        None => println!("  coverage report: outside the configured source roots"),
    }
    Ok(())
}
