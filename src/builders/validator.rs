use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

use crate::builders::patterns::PathMatcher;
use crate::core::config::{CoverageConfig, StyleConfig};

/// The `ConfigValidator` trait defines the interface for semantic validation
/// of loaded configuration records.
///
/// Loading already rejects malformed values; a validator looks for settings
/// that are well-formed but almost certainly mistakes, and reports them as a
/// list of human-readable issues.
pub trait ConfigValidator {
    fn validate_config(
        &self,
        style: &StyleConfig,
        coverage: &CoverageConfig,
    ) -> Result<Vec<String>>;
}

/// The standard set of semantic checks.
pub struct StandardValidator;

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks one glob list for empty entries, duplicates, and patterns that
    /// fail to compile.
    fn check_glob_list(&self, key: &str, patterns: &[String]) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for pattern in patterns {
            if pattern.is_empty() {
                issues.push(format!("empty `{key}` pattern matches nothing"));
                continue;
            }
            if !seen.insert(pattern.as_str()) {
                issues.push(format!("duplicate `{key}` pattern `{pattern}`"));
            }
            if let Err(err) = PathMatcher::new(key, std::slice::from_ref(pattern)) {
                issues.push(format!("invalid `{key}` pattern `{pattern}`: {err}"));
            }
        }
        issues
    }

    fn check_exclude_lines(&self, patterns: &[String]) -> Vec<String> {
        let mut issues = Vec::new();
        for pattern in patterns {
            if pattern.is_empty() || pattern == ".*" {
                issues.push(format!(
                    "`exclude_lines` pattern `{pattern}` matches every line"
                ));
                continue;
            }
            if let Err(err) = Regex::new(pattern) {
                issues.push(format!("invalid `exclude_lines` pattern `{pattern}`: {err}"));
            }
        }
        issues
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(
        &self,
        style: &StyleConfig,
        coverage: &CoverageConfig,
    ) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if style.max_line_length == 0 {
            issues.push("max-line-length of 0 flags every non-empty line".to_string());
        }
        issues.extend(self.check_glob_list("exclude", &style.exclude));

        // An empty prefix is a prefix of every code.
        if style.extend_ignore.contains("") {
            issues.push("empty `extend-ignore` entry suppresses every diagnostic".to_string());
        }

        issues.extend(self.check_glob_list("omit", &coverage.report.omit));
        issues.extend(self.check_exclude_lines(&coverage.report.exclude_lines));

        if coverage.source.is_empty()
            && (coverage.report.skip_covered || coverage.report.show_missing)
        {
            issues.push(
                "report options are set but [coverage:run] has no `source`; \
                 every measured file will be in scope"
                    .to_string(),
            );
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_config_has_no_issues() {
        let style = StyleConfig {
            max_line_length: 99,
            exclude: vec!["build".to_string()],
            ..StyleConfig::default()
        };
        let coverage = CoverageConfig {
            source: ["pkg".to_string()].into_iter().collect(),
            ..CoverageConfig::default()
        };
        let issues = StandardValidator::new()
            .validate_config(&style, &coverage)
            .unwrap();
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn test_zero_line_length_flagged() {
        let style = StyleConfig {
            max_line_length: 0,
            ..StyleConfig::default()
        };
        let issues = StandardValidator::new()
            .validate_config(&style, &CoverageConfig::default())
            .unwrap();
        assert!(issues.iter().any(|issue| issue.contains("max-line-length")));
    }

    #[test]
    fn test_duplicate_and_empty_globs_flagged() {
        let style = StyleConfig {
            exclude: vec!["build".to_string(), "build".to_string(), String::new()],
            ..StyleConfig::default()
        };
        let issues = StandardValidator::new()
            .validate_config(&style, &CoverageConfig::default())
            .unwrap();
        assert!(issues.iter().any(|issue| issue.contains("duplicate")));
        assert!(issues.iter().any(|issue| issue.contains("empty")));
    }

    #[test]
    fn test_match_everything_exclude_line_flagged() {
        let mut coverage = CoverageConfig::default();
        coverage.report.exclude_lines = vec![".*".to_string()];
        let issues = StandardValidator::new()
            .validate_config(&StyleConfig::default(), &coverage)
            .unwrap();
        assert!(issues.iter().any(|issue| issue.contains("every line")));
    }

    #[test]
    fn test_empty_ignore_prefix_flagged() {
        let style = StyleConfig {
            extend_ignore: [String::new()].into_iter().collect(),
            ..StyleConfig::default()
        };
        let issues = StandardValidator::new()
            .validate_config(&style, &CoverageConfig::default())
            .unwrap();
        assert!(issues.iter().any(|issue| issue.contains("extend-ignore")));
    }
}
