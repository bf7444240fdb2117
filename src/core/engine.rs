use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::builders::patterns::{PathMatcher, RuleSuppressor};
use crate::core::config::{ConfigError, StyleConfig};

/// Rule code reported for lines exceeding `max-line-length`.
pub const RULE_LINE_TOO_LONG: &str = "E501";

/// A single style finding, reported once per offending line.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub path: String,
    pub line: usize,
    pub code: String,
    pub message: String,
}

/// Applies a [`StyleConfig`] the way the consuming linter does: excluded
/// paths are skipped before scanning, remaining files get line-length
/// diagnostics, and suppressed rule codes are dropped before reporting.
pub struct StyleEngine {
    config: StyleConfig,
    exclude: PathMatcher,
    suppressor: RuleSuppressor,
}

impl StyleEngine {
    pub fn new(config: StyleConfig) -> Result<Self, ConfigError> {
        let exclude = PathMatcher::new("exclude", &config.exclude)?;
        let suppressor = RuleSuppressor::new(config.extend_ignore.iter().cloned());
        Ok(Self {
            config,
            exclude,
            suppressor,
        })
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.is_match(path)
    }

    pub fn excluding_pattern(&self, path: &str) -> Option<&str> {
        self.exclude.matched_pattern(path)
    }

    /// Scans one file's content. An excluded path yields no diagnostics at
    /// all; otherwise each over-long line yields exactly one `E501`, and
    /// suppression is applied before returning.
    pub fn check_content(&self, path: &str, content: &str) -> Vec<Diagnostic> {
        if self.is_excluded(path) {
            return Vec::new();
        }

        let max = self.config.max_line_length;
        let mut diagnostics = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let length = line.chars().count();
            if length > max {
                diagnostics.push(Diagnostic {
                    path: path.to_string(),
                    line: index + 1,
                    code: RULE_LINE_TOO_LONG.to_string(),
                    message: format!("line too long ({length} > {max})"),
                });
            }
        }
        self.filter_diagnostics(diagnostics)
    }

    /// Drops every diagnostic whose code starts with an ignored prefix.
    /// External diagnostics pass through here too, not only our own.
    pub fn filter_diagnostics(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        diagnostics
            .into_iter()
            .filter(|diagnostic| !self.suppressor.is_suppressed(&diagnostic.code))
            .collect()
    }

    /// Checks a file, or recursively a directory tree. Excluded directories
    /// are pruned without descending into them; only `.py` files are
    /// scanned.
    pub fn check_path(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        self.visit(path, &mut diagnostics)?;
        Ok(diagnostics)
    }

    fn visit(&self, path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Result<()> {
        let key = path_key(path);
        if self.is_excluded(&key) {
            return Ok(());
        }

        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("Failed to read directory {}", path.display()))?;
            for entry in entries.flatten() {
                self.visit(&entry.path(), diagnostics)?;
            }
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("py") {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            diagnostics.extend(self.check_content(&key, &content));
        }
        Ok(())
    }
}

/// Normalized path string used for pattern matching and reporting.
fn path_key(path: &Path) -> String {
    let key = path.to_string_lossy().replace('\\', "/");
    key.strip_prefix("./").unwrap_or(&key).to_string()
}
