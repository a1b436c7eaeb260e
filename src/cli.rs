// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitedag",
    version,
    about = "Build a static site: clean, bundle styles, minify scripts, copy graphics, render pages.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run, together with everything it depends on.
    #[arg(value_name = "TARGET", default_value = "default")]
    pub target: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Sitedag.toml` in the project root; if that file does not
    /// exist, the built-in layout is used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Project directory that source globs and output roots are relative to.
    ///
    /// Default: the directory holding `--config`, else the current directory.
    #[arg(long, value_name = "DIR")]
    pub root: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the task graph and print the plan, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
