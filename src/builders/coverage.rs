use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::builders::patterns::LineExcluder;
use crate::core::config::CoverageConfig;

/// What one measurement run recorded for one file: executed 1-based line
/// numbers, plus executed branch arcs when branch measurement was on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeasurement {
    #[serde(default)]
    pub executed: BTreeSet<usize>,
    #[serde(default)]
    pub arcs: BTreeSet<(usize, usize)>,
}

/// A per-process measurement artifact, serialized as JSON by the measuring
/// engine and read back here at report time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub files: BTreeMap<String, FileMeasurement>,
}

impl Measurement {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read measurement artifact {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse measurement artifact {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize measurement")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write measurement artifact {}", path.display()))?;
        Ok(())
    }

    /// Merges another artifact into this one. Per file the executed-line and
    /// arc sets are unioned, so the operation is idempotent, commutative,
    /// and associative: merge order and process count never change the
    /// result.
    pub fn merge(&mut self, other: Measurement) {
        for (path, incoming) in other.files {
            let entry = self.files.entry(path).or_default();
            entry.executed.extend(incoming.executed);
            entry.arcs.extend(incoming.arcs);
        }
    }

    /// Unions any number of artifacts into one.
    pub fn merged(parts: impl IntoIterator<Item = Measurement>) -> Measurement {
        let mut combined = Measurement::default();
        for part in parts {
            combined.merge(part);
        }
        combined
    }
}

/// Coverage accounting for one file after line exclusion.
///
/// `countable` is the number of non-blank, non-comment-only source lines;
/// `excluded` lines are removed from both the numerator and the denominator
/// before any percentage is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAccounting {
    pub path: String,
    pub countable: usize,
    pub excluded: Vec<usize>,
    pub missed: Vec<usize>,
    /// Executed branch arcs recorded for the file.
    pub branches: usize,
}

impl FileAccounting {
    /// Lines that still require coverage after exclusion.
    pub fn statements(&self) -> usize {
        self.countable - self.excluded.len()
    }

    /// Percentage covered, computed after exclusion:
    /// `(countable - excluded - missed) / (countable - excluded)`.
    /// A file with nothing left to cover reports 100%.
    pub fn percent(&self) -> f64 {
        let denominator = self.statements();
        if denominator == 0 {
            100.0
        } else {
            (denominator - self.missed.len()) as f64 * 100.0 / denominator as f64
        }
    }
}

/// Accounts one file: walks the source text, classifies each line, and
/// subtracts exclusions before anything is missed.
pub fn account_file(
    path: &str,
    source: &str,
    measured: &FileMeasurement,
    excluder: &LineExcluder,
) -> FileAccounting {
    let mut countable = 0;
    let mut excluded = Vec::new();
    let mut missed = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        countable += 1;
        if excluder.is_excluded(raw) {
            excluded.push(number);
        } else if !measured.executed.contains(&number) {
            missed.push(number);
        }
    }

    FileAccounting {
        path: path.to_string(),
        countable,
        excluded,
        missed,
        branches: measured.arcs.len(),
    }
}

/// Accounts every measured file under the configured source roots, reading
/// each source relative to `root`.
pub fn account(
    measurement: &Measurement,
    config: &CoverageConfig,
    root: &Path,
) -> Result<Vec<FileAccounting>> {
    let excluder = LineExcluder::new(&config.report.exclude_lines)?;
    let mut accountings = Vec::new();
    for (path, measured) in &measurement.files {
        if !config.is_in_source(path) {
            continue;
        }
        let source = fs::read_to_string(root.join(path))
            .with_context(|| format!("Failed to read measured source {path}"))?;
        accountings.push(account_file(path, &source, measured, &excluder));
    }
    Ok(accountings)
}
