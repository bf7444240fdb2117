//! The idea is simple: a project keeps one configuration file that two
//! separate tools read at startup. The style checker wants a line-length
//! limit, paths to skip, and rule codes to silence; the coverage reporter
//! wants its measurement mode, source roots, and the patterns that decide
//! what a report shows. Both tools should agree on how those settings are
//! interpreted, so the loading and the matching semantics live here, once.
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use checkrc::utils;

#[derive(Parser)]
#[command(name = "checkrc")]
#[command(about = "Shared configuration for the style checker and the coverage reporter")]
struct Cli {
    /// Explicit path to the configuration file (skips discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file and report issues
    Validate,
    /// Print the effective configuration
    Show {
        /// Output format: toml, json, or yaml
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Run the line-length check over the given paths
    Check {
        /// Files or directories to scan (defaults to the current directory)
        paths: Vec<PathBuf>,
    },
    /// Merge measurement artifacts and render the coverage report
    Report {
        /// Measurement artifact files written by the coverage engine
        artifacts: Vec<PathBuf>,
    },
    /// Explain how the configuration treats a path
    Explain {
        /// Path to look up against the exclude and omit patterns
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate => utils::run_validate(cli.config),
        Commands::Show { format } => utils::run_show(cli.config, &format),
        Commands::Check { paths } => utils::run_check(cli.config, &paths),
        Commands::Report { artifacts } => utils::run_report(cli.config, &artifacts),
        Commands::Explain { path } => utils::run_explain(cli.config, &path),
    }
}
