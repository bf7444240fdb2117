use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexSet};
use std::collections::BTreeSet;

use crate::core::config::ConfigError;

/// Line-exclusion patterns that are always active, regardless of what the
/// configuration file declares. User-supplied `exclude_lines` entries are
/// unioned with these, never replace them.
///
/// The list covers the defensive-programming idioms that measurement should
/// not penalize: an explicit no-cover marker, unconditional assertion or
/// not-implemented raises, the `NotImplemented` sentinel return, a bare
/// re-raise, and the interpreter entry-point guard.
pub const DEFAULT_EXCLUDE_LINES: &[&str] = &[
    r"#\s*pragma:\s*no\s*cover",
    r"^\s*raise AssertionError\b",
    r"^\s*raise NotImplementedError\b",
    r"^\s*return NotImplemented\b",
    r"^\s*raise$",
    r#"^\s*if __name__ == ['"]__main__['"]:"#,
];

/// A compiled set of shell-glob path patterns with directory-prefix
/// semantics.
///
/// Each configured pattern matches:
/// - the path itself (`build` matches `build`),
/// - anything beneath it when it names a directory (`build` matches
///   `build/lib/x.py`),
/// - and, for bare names without a `/`, the same two forms anywhere in the
///   tree (`__pycache__` matches `src/pkg/__pycache__/x.pyc`).
///
/// `*` never crosses a path separator; descendants are covered by the
/// expansions above, so the patterns keep ordinary shell-glob semantics.
#[derive(Debug)]
pub struct PathMatcher {
    set: GlobSet,
    /// Maps each compiled glob back to the index of the configured pattern
    /// it was expanded from, so matches can be reported in the user's terms.
    sources: Vec<usize>,
    patterns: Vec<String>,
}

impl PathMatcher {
    /// Compiles the given glob patterns. `key` names the configuration key
    /// the patterns came from (`exclude` or `omit`) and is used in error
    /// messages.
    ///
    /// # Errors
    /// Returns [`ConfigError::Malformed`] when a pattern fails to compile
    /// (for example an unterminated character class).
    pub fn new(key: &str, patterns: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        let mut sources = Vec::new();

        for (index, pattern) in patterns.iter().enumerate() {
            for expanded in Self::expansions(pattern) {
                let glob = GlobBuilder::new(&expanded)
                    .literal_separator(true)
                    .build()
                    .map_err(|err| ConfigError::Malformed {
                        key: key.to_string(),
                        value: pattern.clone(),
                        reason: err.kind().to_string(),
                    })?;
                builder.add(glob);
                sources.push(index);
            }
        }

        let set = builder.build().map_err(|err| ConfigError::Malformed {
            key: key.to_string(),
            value: patterns.join(", "),
            reason: err.kind().to_string(),
        })?;

        Ok(Self {
            set,
            sources,
            patterns: patterns.to_vec(),
        })
    }

    /// Expands one configured pattern into the glob forms that implement the
    /// directory-prefix semantics described on the type.
    fn expansions(pattern: &str) -> Vec<String> {
        let trimmed = pattern.trim_end_matches('/');
        let mut expanded = vec![trimmed.to_string(), format!("{trimmed}/**")];
        if !trimmed.contains('/') {
            expanded.push(format!("**/{trimmed}"));
            expanded.push(format!("**/{trimmed}/**"));
        }
        expanded
    }

    /// Returns `true` when the path matches any configured pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    /// Returns the first configured pattern (in configuration order) that
    /// matches the path, or `None` when nothing matches.
    pub fn matched_pattern(&self, path: &str) -> Option<&str> {
        self.set
            .matches(path)
            .into_iter()
            .map(|compiled| self.sources[compiled])
            .min()
            .map(|index| self.patterns[index].as_str())
    }

    /// The configured patterns, in order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Suppresses diagnostics whose rule code starts with any configured prefix.
///
/// A full code is simply a prefix of maximal length, so exact-code entries
/// and family prefixes (`E2` silencing every `E2xx` code) both work through
/// the same check.
#[derive(Debug, Clone)]
pub struct RuleSuppressor {
    prefixes: BTreeSet<String>,
}

impl RuleSuppressor {
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
        }
    }

    /// Returns `true` when the code starts with any configured prefix.
    pub fn is_suppressed(&self, code: &str) -> bool {
        self.suppressing_prefix(code).is_some()
    }

    /// Returns the prefix responsible for suppressing the code, if any.
    pub fn suppressing_prefix(&self, code: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|prefix| code.starts_with(prefix.as_str()))
            .map(|prefix| prefix.as_str())
    }
}

/// Decides whether a source line is excluded from coverage accounting.
///
/// The compiled set is the union of [`DEFAULT_EXCLUDE_LINES`] and the
/// user-supplied `exclude_lines` patterns; matching is per-line against the
/// raw source text.
#[derive(Debug)]
pub struct LineExcluder {
    set: RegexSet,
    patterns: Vec<String>,
}

impl LineExcluder {
    /// Builds the excluder from the user patterns, unioned with the built-in
    /// defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Malformed`] naming the offending pattern when
    /// one fails to compile.
    pub fn new(user_patterns: &[String]) -> Result<Self, ConfigError> {
        let mut patterns: Vec<String> =
            DEFAULT_EXCLUDE_LINES.iter().map(|p| p.to_string()).collect();
        patterns.extend(user_patterns.iter().cloned());

        // Compile one at a time first so an error can be attributed to the
        // exact pattern, then build the set used for matching.
        for pattern in &patterns {
            Regex::new(pattern).map_err(|err| ConfigError::Malformed {
                key: "exclude_lines".to_string(),
                value: pattern.clone(),
                reason: err.to_string(),
            })?;
        }
        let set = RegexSet::new(&patterns).map_err(|err| ConfigError::Malformed {
            key: "exclude_lines".to_string(),
            value: patterns.join(", "),
            reason: err.to_string(),
        })?;

        Ok(Self { set, patterns })
    }

    /// Returns `true` when the line matches any exclusion pattern.
    pub fn is_excluded(&self, line: &str) -> bool {
        self.set.is_match(line)
    }

    /// The full pattern union, defaults first, in matching order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
