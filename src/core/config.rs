use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::builders::patterns::{LineExcluder, PathMatcher};

/// File names probed during discovery, in order of preference.
pub const CANDIDATE_FILE_NAMES: &[&str] = &["checkrc.cfg", "setup.cfg"];

const SECTION_STYLE: &str = "style";
const SECTION_COVERAGE_RUN: &str = "coverage:run";
const SECTION_COVERAGE_REPORT: &str = "coverage:report";

/// Errors produced while locating or parsing the configuration file.
///
/// Malformed values abort startup; unknown keys and sections never appear
/// here, they are collected as warnings on [`LoadOutcome`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (looked for {candidates} upward from {start})")]
    NotFound { candidates: String, start: String },
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },
    #[error("malformed value for `{key}`: {reason} (got `{value}`)")]
    Malformed {
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings consumed by the style checker before it scans source files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Upper bound on permissible source line length, in characters.
    pub max_line_length: usize,
    /// Glob patterns for paths skipped entirely; directory entries match all
    /// descendants.
    pub exclude: Vec<String>,
    /// Rule-code prefixes whose diagnostics are never reported.
    pub extend_ignore: BTreeSet<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_line_length: 79,
            exclude: Vec::new(),
            extend_ignore: BTreeSet::new(),
        }
    }
}

/// Report-phase settings for the coverage reporter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the missed line numbers per file.
    pub show_missing: bool,
    /// Hide fully-covered files from the per-file table. They still count
    /// toward the aggregate totals.
    pub skip_covered: bool,
    /// Glob patterns for files dropped from the report entirely.
    pub omit: Vec<String>,
    /// Regex patterns; matching lines are removed from coverage accounting
    /// before any percentage is computed. Unioned with the built-in
    /// defaults, never replacing them.
    pub exclude_lines: Vec<String>,
}

/// Settings consumed by the coverage engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Measure branch-decision outcomes in addition to executed lines.
    pub branch: bool,
    /// Package or module roots included in measurement. Empty means
    /// everything measured is in scope.
    pub source: BTreeSet<String>,
    /// Multiple per-process measurement artifacts are merged before
    /// reporting.
    pub parallel: bool,
    pub report: ReportConfig,
}

impl CoverageConfig {
    /// Whether a measured path falls under one of the configured source
    /// roots.
    pub fn is_in_source(&self, path: &str) -> bool {
        if self.source.is_empty() {
            return true;
        }
        self.source.iter().any(|root| {
            let root = root.trim_end_matches('/');
            path == root || path.starts_with(&format!("{root}/"))
        })
    }
}

/// The result of loading a configuration file: both immutable records plus
/// the non-fatal warnings (unknown keys and sections) accumulated on the way.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub style: StyleConfig,
    pub coverage: CoverageConfig,
    pub warnings: Vec<String>,
}

/// Both records bundled for serialization by `checkrc show`.
#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub style: StyleConfig,
    pub coverage: CoverageConfig,
}

impl EffectiveConfig {
    pub fn render_as(&self, format: &str) -> Result<String> {
        match format {
            "json" => serde_json::to_string_pretty(self).context("Failed to serialize to JSON"),
            "yaml" => serde_yaml::to_string(self).context("Failed to serialize to YAML"),
            "toml" | _ => toml::to_string_pretty(self).context("Failed to serialize to TOML"),
        }
    }
}

struct RawEntry {
    key: String,
    value: String,
}

struct RawSection {
    name: String,
    entries: Vec<RawEntry>,
}

/// Reads the INI-style surface form: `[section]` headers at column zero,
/// `key = value` entries, and indented continuation lines extending the
/// previous entry's value (multi-line lists). Full-line comments start with
/// `#` or `;`.
fn parse_raw(text: &str) -> Result<Vec<RawSection>, ConfigError> {
    let mut sections: Vec<RawSection> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if raw.starts_with([' ', '\t']) {
            let entry = sections
                .last_mut()
                .and_then(|section| section.entries.last_mut())
                .ok_or(ConfigError::Syntax {
                    line,
                    reason: "continuation line without a preceding key".to_string(),
                })?;
            if entry.value.is_empty() {
                entry.value = trimmed.to_string();
            } else {
                entry.value.push('\n');
                entry.value.push_str(trimmed);
            }
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or(ConfigError::Syntax {
                line,
                reason: "unterminated section header".to_string(),
            })?;
            sections.push(RawSection {
                name: name.trim().to_string(),
                entries: Vec::new(),
            });
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or(ConfigError::Syntax {
            line,
            reason: "expected `key = value`".to_string(),
        })?;
        let section = sections.last_mut().ok_or(ConfigError::Syntax {
            line,
            reason: "entry before any section header".to_string(),
        })?;
        section.entries.push(RawEntry {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        });
    }

    Ok(sections)
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::Malformed {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected an integer".to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::Malformed {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a boolean literal (true/false, yes/no, on/off, 1/0)".to_string(),
        }),
    }
}

/// Splits a list value on commas and newlines. Used for path and rule-code
/// lists.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(['\n', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a list value on newlines only. Regexes may contain commas, so
/// `exclude_lines` entries are one per line.
fn parse_line_list(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_style(
    style: &mut StyleConfig,
    entries: &[RawEntry],
    warnings: &mut Vec<String>,
) -> Result<(), ConfigError> {
    for entry in entries {
        match entry.key.as_str() {
            "max-line-length" => {
                style.max_line_length = parse_usize(&entry.key, &entry.value)?;
            }
            "exclude" => style.exclude = parse_list(&entry.value),
            "extend-ignore" => {
                style.extend_ignore = parse_list(&entry.value).into_iter().collect();
            }
            other => warnings.push(format!("unknown key `{other}` in [{SECTION_STYLE}] ignored")),
        }
    }
    Ok(())
}

fn apply_coverage_run(
    coverage: &mut CoverageConfig,
    entries: &[RawEntry],
    warnings: &mut Vec<String>,
) -> Result<(), ConfigError> {
    for entry in entries {
        match entry.key.as_str() {
            "branch" => coverage.branch = parse_bool(&entry.key, &entry.value)?,
            "source" => coverage.source = parse_list(&entry.value).into_iter().collect(),
            "parallel" => coverage.parallel = parse_bool(&entry.key, &entry.value)?,
            other => warnings.push(format!(
                "unknown key `{other}` in [{SECTION_COVERAGE_RUN}] ignored"
            )),
        }
    }
    Ok(())
}

fn apply_coverage_report(
    report: &mut ReportConfig,
    entries: &[RawEntry],
    warnings: &mut Vec<String>,
) -> Result<(), ConfigError> {
    for entry in entries {
        match entry.key.as_str() {
            "show_missing" => report.show_missing = parse_bool(&entry.key, &entry.value)?,
            "skip_covered" => report.skip_covered = parse_bool(&entry.key, &entry.value)?,
            "omit" => report.omit = parse_list(&entry.value),
            "exclude_lines" => report.exclude_lines = parse_line_list(&entry.value),
            other => warnings.push(format!(
                "unknown key `{other}` in [{SECTION_COVERAGE_REPORT}] ignored"
            )),
        }
    }
    Ok(())
}

/// Parses the configuration text into both records.
///
/// Pattern lists are compiled once here so that an unterminated glob or a
/// bad regex aborts startup instead of surfacing mid-run.
pub fn parse_config(text: &str) -> Result<LoadOutcome, ConfigError> {
    let sections = parse_raw(text)?;

    let mut style = StyleConfig::default();
    let mut coverage = CoverageConfig::default();
    let mut warnings = Vec::new();

    for section in &sections {
        match section.name.as_str() {
            SECTION_STYLE => apply_style(&mut style, &section.entries, &mut warnings)?,
            SECTION_COVERAGE_RUN => {
                apply_coverage_run(&mut coverage, &section.entries, &mut warnings)?;
            }
            SECTION_COVERAGE_REPORT => {
                apply_coverage_report(&mut coverage.report, &section.entries, &mut warnings)?;
            }
            other => warnings.push(format!("unknown section `[{other}]` ignored")),
        }
    }

    PathMatcher::new("exclude", &style.exclude)?;
    PathMatcher::new("omit", &coverage.report.omit)?;
    LineExcluder::new(&coverage.report.exclude_lines)?;

    Ok(LoadOutcome {
        style,
        coverage,
        warnings,
    })
}

/// Locates the configuration file and hands out the parsed records.
pub struct ConfigManager {
    config_path: PathBuf,
    root: PathBuf,
}

impl ConfigManager {
    /// Discovers the configuration file by walking upward from the current
    /// directory.
    pub fn new() -> Result<Self> {
        let start = std::env::current_dir()?;
        let config_path = discover(&start)?;
        Ok(Self::from_config_path(config_path))
    }

    /// Discovers the configuration file starting at the given directory.
    pub fn new_at(root: PathBuf) -> Result<Self> {
        let config_path = discover(&root)?;
        Ok(Self::from_config_path(config_path))
    }

    /// Uses an explicit configuration file path, bypassing discovery.
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        anyhow::ensure!(
            config_path.is_file(),
            "configuration file {} does not exist",
            config_path.display()
        );
        Ok(Self::from_config_path(config_path))
    }

    fn from_config_path(config_path: PathBuf) -> Self {
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config_path, root }
    }

    /// The directory containing the configuration file. Relative paths in
    /// the file are resolved against it.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<LoadOutcome>;
    fn config_path(&self) -> &Path;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<LoadOutcome> {
        let content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file {}", self.config_path.display())
        })?;
        let outcome = parse_config(&content)
            .with_context(|| format!("Failed to parse {}", self.config_path.display()))?;
        Ok(outcome)
    }

    fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn discover(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut dir = start;
    loop {
        for name in CANDIDATE_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => {
                return Err(ConfigError::NotFound {
                    candidates: CANDIDATE_FILE_NAMES.join(", "),
                    start: start.display().to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# project tooling configuration
[style]
max-line-length = 99
exclude =
    build,
    docs
extend-ignore = E2, W503

[coverage:run]
branch = True
source = pkg
parallel = on

[coverage:report]
show_missing = yes
skip_covered = no
omit = */vendored/*
exclude_lines =
    ^\\s*@overload
    \\#\\s*type:\\s*ignore
";

    #[test]
    fn test_parses_both_sections() {
        let outcome = parse_config(SAMPLE).unwrap();

        assert_eq!(outcome.style.max_line_length, 99);
        assert_eq!(outcome.style.exclude, vec!["build", "docs"]);
        assert!(outcome.style.extend_ignore.contains("E2"));
        assert!(outcome.style.extend_ignore.contains("W503"));

        assert!(outcome.coverage.branch);
        assert!(outcome.coverage.parallel);
        assert!(outcome.coverage.source.contains("pkg"));
        assert!(outcome.coverage.report.show_missing);
        assert!(!outcome.coverage.report.skip_covered);
        assert_eq!(outcome.coverage.report.omit, vec!["*/vendored/*"]);
        // Regex entries split on newlines only, commas stay inside a pattern.
        assert_eq!(
            outcome.coverage.report.exclude_lines,
            vec!["^\\s*@overload", "\\#\\s*type:\\s*ignore"]
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let outcome = parse_config("[style]\nmax-line-length = 100\n").unwrap();
        assert_eq!(outcome.style.max_line_length, 100);
        assert_eq!(outcome.coverage, CoverageConfig::default());
    }

    #[test]
    fn test_non_numeric_length_is_malformed() {
        let err = parse_config("[style]\nmax-line-length = ninety\n").unwrap_err();
        match err {
            ConfigError::Malformed { key, value, .. } => {
                assert_eq!(key, "max-line-length");
                assert_eq!(value, "ninety");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_boolean_is_malformed() {
        let err = parse_config("[coverage:run]\nbranch = maybe\n").unwrap_err();
        match err {
            ConfigError::Malformed { key, .. } => assert_eq!(key, "branch"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_glob_aborts_load() {
        let err = parse_config("[style]\nexclude = src/[\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_unknown_keys_warn_but_load() {
        let outcome = parse_config("[style]\nmax-doc-length = 72\n").unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("max-doc-length"));
        assert_eq!(outcome.style.max_line_length, 79);
    }

    #[test]
    fn test_unknown_section_warns_but_loads() {
        let outcome = parse_config("[isort]\nprofile = black\n").unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("isort"));
    }

    #[test]
    fn test_entry_before_section_is_syntax_error() {
        let err = parse_config("max-line-length = 99\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_continuation_without_key_is_syntax_error() {
        let err = parse_config("[style]\n    build\n").unwrap_err();
        match err {
            ConfigError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_source_roots() {
        let config = CoverageConfig {
            source: ["pkg".to_string()].into_iter().collect(),
            ..CoverageConfig::default()
        };
        assert!(config.is_in_source("pkg/api.py"));
        assert!(config.is_in_source("pkg"));
        assert!(!config.is_in_source("pkgother/api.py"));

        let unrestricted = CoverageConfig::default();
        assert!(unrestricted.is_in_source("anything/at/all.py"));
    }
}
