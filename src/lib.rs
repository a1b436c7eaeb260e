// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{SiteConfig, default_config_path, load_or_default};
use crate::dag::Plan;
use crate::engine::RunReport;
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::pipeline::build_orchestrator;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and project-root resolution
/// - the site task graph
/// - either a dry-run plan printout or a real run
///
/// Returns `None` for a dry run, otherwise the run's report. Validation
/// errors (unknown target, unknown dependency, cycle) surface as `Err`
/// before anything executes.
pub async fn run(args: CliArgs) -> Result<Option<RunReport>> {
    let (config_path, root) = resolve_paths(&args);
    let cfg = load_or_default(&config_path, args.config.is_some())?;
    info!(root = %root.display(), config = %config_path.display(), "project resolved");

    let orch = build_orchestrator(&cfg, &root, Arc::new(RealFileSystem))?;

    if args.dry_run {
        let plan = orch.plan(&args.target)?;
        print_dry_run(&cfg, &root, &plan);
        return Ok(None);
    }

    let report = orch.run(&args.target).await?;
    print_summary(&report);
    Ok(Some(report))
}

/// Work out the config file and the project root.
///
/// - `--root` wins for the root; the config defaults to `Sitedag.toml` in it.
/// - otherwise the root is the directory holding `--config`.
/// - a bare filename like "Sitedag.toml" (parent = "") means the current
///   working directory.
fn resolve_paths(args: &CliArgs) -> (PathBuf, PathBuf) {
    match (&args.root, &args.config) {
        (Some(root), Some(config)) => (PathBuf::from(config), PathBuf::from(root)),
        (Some(root), None) => {
            let root = PathBuf::from(root);
            (root.join(default_config_path()), root)
        }
        (None, Some(config)) => {
            let config = PathBuf::from(config);
            let root = config_root_dir(&config);
            (config, root)
        }
        (None, None) => (default_config_path(), current_dir()),
    }
}

fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => current_dir(),
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn print_dry_run(cfg: &SiteConfig, root: &Path, plan: &Plan) {
    let paths = cfg.paths();
    println!("sitedag dry-run");
    println!("  root = {}", root.display());
    println!("  content = {}  template = {}", paths.content, paths.template);
    println!("  styles = {}  scripts = {}  graphics = {}", paths.styles, paths.scripts, paths.graphics);
    println!("  build = {}  dist = {}", paths.build, paths.dist);
    println!();

    println!("target: {}", plan.target());
    for (i, wave) in plan.waves().iter().enumerate() {
        println!("  wave {}: {}", i + 1, wave.join(", "));
        for task in wave {
            let deps = plan.graph().dependencies_of(task);
            if !deps.is_empty() {
                println!("      {task} after: {}", deps.join(", "));
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(report: &RunReport) {
    for (task, state) in &report.states {
        match report.failures.get(task) {
            Some(message) => println!("{task:<12} {state}\n{}", indent(message)),
            None => println!("{task:<12} {state}"),
        }
    }
    let verdict = if report.is_success() { "succeeded" } else { "failed" };
    println!("target '{}' {verdict}", report.target);
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
