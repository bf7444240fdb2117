use anyhow::Result;
use colored::Colorize;

use crate::builders::coverage::FileAccounting;
use crate::builders::patterns::PathMatcher;
use crate::core::config::{ConfigError, CoverageConfig, ReportConfig};
use crate::core::engine::Diagnostic;

/// One visible line of the per-file coverage table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub path: String,
    pub statements: usize,
    pub missed: Vec<usize>,
    pub branches: usize,
    pub percent: f64,
}

/// The assembled coverage report: the visible rows plus aggregate totals.
///
/// Files hidden by `skip_covered` are absent from `rows` but still included
/// in the totals; files matching `omit` contribute to neither.
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub rows: Vec<ReportRow>,
    pub skipped_covered: usize,
    pub total_statements: usize,
    pub total_missed: usize,
    pub total_branches: usize,
}

impl CoverageReport {
    pub fn total_percent(&self) -> f64 {
        if self.total_statements == 0 {
            100.0
        } else {
            (self.total_statements - self.total_missed) as f64 * 100.0
                / self.total_statements as f64
        }
    }
}

/// Builds the report from per-file accountings, applying `omit` and
/// `skip_covered` in that order.
pub fn assemble(
    accountings: Vec<FileAccounting>,
    config: &ReportConfig,
) -> Result<CoverageReport, ConfigError> {
    let omit = PathMatcher::new("omit", &config.omit)?;
    let mut report = CoverageReport::default();

    for accounting in accountings {
        if omit.is_match(&accounting.path) {
            continue;
        }

        let statements = accounting.statements();
        let percent = accounting.percent();
        report.total_statements += statements;
        report.total_missed += accounting.missed.len();
        report.total_branches += accounting.branches;

        if config.skip_covered && accounting.missed.is_empty() {
            report.skipped_covered += 1;
            continue;
        }

        report.rows.push(ReportRow {
            path: accounting.path,
            statements,
            missed: accounting.missed,
            branches: accounting.branches,
            percent,
        });
    }

    report.rows.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(report)
}

/// Collapses sorted line numbers into the compact `3-5, 9` form.
pub fn format_line_ranges(lines: &[usize]) -> String {
    fn part(start: usize, end: usize) -> String {
        if start == end {
            start.to_string()
        } else {
            format!("{start}-{end}")
        }
    }

    let mut parts = Vec::new();
    let mut numbers = lines.iter().copied();
    let Some(first) = numbers.next() else {
        return String::new();
    };

    let (mut start, mut end) = (first, first);
    for number in numbers {
        if number == end + 1 {
            end = number;
        } else {
            parts.push(part(start, end));
            start = number;
            end = number;
        }
    }
    parts.push(part(start, end));
    parts.join(", ")
}

pub trait ReportRenderer {
    fn render(&self, report: &CoverageReport, config: &CoverageConfig) -> Result<()>;
}

/// Prints the coverage table to standard output.
pub struct ConsoleRenderer;

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self
    }

    fn colorize_percent(percent: f64, padded: String) -> String {
        if percent >= 100.0 {
            padded.green().to_string()
        } else if percent < 50.0 {
            padded.red().to_string()
        } else {
            padded.yellow().to_string()
        }
    }
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer for ConsoleRenderer {
    fn render(&self, report: &CoverageReport, config: &CoverageConfig) -> Result<()> {
        let name_width = report
            .rows
            .iter()
            .map(|row| row.path.len())
            .chain(["Name".len(), "TOTAL".len()])
            .max()
            .unwrap_or(5);

        println!("📊 Coverage Report");
        println!("==================");
        println!();

        let mut header = format!("{:<name_width$}  Stmts   Miss  Cover", "Name");
        if config.branch {
            header.push_str("  Branch");
        }
        if config.report.show_missing {
            header.push_str("  Missing");
        }
        let rule = "-".repeat(header.len());
        println!("{header}");
        println!("{rule}");

        for row in &report.rows {
            let percent = format!("{:>4}%", row.percent.floor() as u64);
            let mut line = format!(
                "{:<name_width$}  {:>5}  {:>5}  {}",
                row.path,
                row.statements,
                row.missed.len(),
                Self::colorize_percent(row.percent, percent),
            );
            if config.branch {
                line.push_str(&format!("  {:>6}", row.branches));
            }
            if config.report.show_missing {
                line.push_str(&format!("  {}", format_line_ranges(&row.missed)));
            }
            println!("{line}");
        }

        println!("{rule}");
        let total_percent = report.total_percent();
        let percent = format!("{:>4}%", total_percent.floor() as u64);
        let mut total = format!(
            "{}  {:>5}  {:>5}  {}",
            format!("{:<name_width$}", "TOTAL").bold(),
            report.total_statements,
            report.total_missed,
            Self::colorize_percent(total_percent, percent),
        );
        if config.branch {
            total.push_str(&format!("  {:>6}", report.total_branches));
        }
        println!("{total}");

        if report.skipped_covered > 0 {
            let noun = if report.skipped_covered == 1 {
                "file"
            } else {
                "files"
            };
            println!();
            println!(
                "{} {noun} skipped due to complete coverage.",
                report.skipped_covered
            );
        }

        Ok(())
    }
}

/// Prints style diagnostics in `path:line: code message` form with a short
/// summary.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        println!(
            "{}:{}: {} {}",
            diagnostic.path,
            diagnostic.line,
            diagnostic.code.yellow(),
            diagnostic.message
        );
    }
    if diagnostics.is_empty() {
        println!("✓ No style issues found.");
    } else {
        println!();
        println!("⚠️  {} style issue(s) found.", diagnostics.len());
    }
}
