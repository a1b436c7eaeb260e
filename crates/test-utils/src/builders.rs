#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitedag::config::{CommandTaskConfig, PagesSection, PathsSection, RawSiteConfig, SiteConfig};
use sitedag::dag::Plan;
use sitedag::engine::{Orchestrator, TaskAction};
use sitedag::errors::Result;
use sitedag::fs::mock::MockFileSystem;

/// Shared, ordered record of which task actions started.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.entries.lock().unwrap().push(name.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|n| n == name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// Action that records its start in `log`, optionally sleeps, then succeeds
/// or fails.
pub fn recording_action(log: ExecutionLog, name: &str, delay: Duration, fail: bool) -> impl TaskAction + use<> {
    let name = name.to_string();
    move || {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.record(&name);
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            if fail {
                anyhow::bail!("{name} failed on purpose");
            }
            Ok(())
        }
    }
}

async fn explode() -> anyhow::Result<()> {
    panic!("task action blew up")
}

/// Builder for small task graphs of recording actions.
///
/// ```ignore
/// let log = ExecutionLog::new();
/// let orch = TaskGraphBuilder::new()
///     .task("a", &[])
///     .task("b", &["a"])
///     .failing("a")
///     .build(&log);
/// ```
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: Vec<(String, Vec<String>)>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: BTreeMap<String, Duration>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, name: &str, deps: &[&str]) -> Self {
        self.tasks
            .push((name.to_string(), deps.iter().map(|d| d.to_string()).collect()));
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn panicking(mut self, name: &str) -> Self {
        self.panicking.insert(name.to_string());
        self
    }

    pub fn delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Register every task; panics on a registration error.
    pub fn build(self, log: &ExecutionLog) -> Orchestrator {
        self.try_build(log).expect("Failed to register tasks from builder")
    }

    pub fn try_build(self, log: &ExecutionLog) -> Result<Orchestrator> {
        let mut orch = Orchestrator::new();
        for (name, deps) in &self.tasks {
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            if self.panicking.contains(name) {
                let log = log.clone();
                let task = name.clone();
                orch.register(
                    name.clone(),
                    move || {
                        log.record(&task);
                        explode()
                    },
                    &deps,
                )?;
            } else {
                let delay = self.delays.get(name).copied().unwrap_or_default();
                let fail = self.failing.contains(name);
                orch.register(name.clone(), recording_action(log.clone(), name, delay, fail), &deps)?;
            }
        }
        Ok(orch)
    }

    /// Validate the graph without actions.
    pub fn plan(&self, target: &str) -> Result<Plan> {
        let deps: BTreeMap<&str, &[String]> = self
            .tasks
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.as_slice()))
            .collect();
        Plan::build(target, |name| deps.get(name).copied())
    }
}

/// Builder for `SiteConfig`, going through the same validation as a file.
#[derive(Debug, Default)]
pub struct SiteConfigBuilder {
    raw: RawSiteConfig,
}

impl SiteConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawSiteConfig {
                paths: PathsSection::default(),
                pages: PagesSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn content(mut self, glob: &str) -> Self {
        self.raw.paths.content = glob.to_string();
        self
    }

    pub fn template(mut self, path: &str) -> Self {
        self.raw.paths.template = path.to_string();
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.raw.pages.extension = ext.to_string();
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.raw.pages.pretty = pretty;
        self
    }

    pub fn command_task(mut self, name: &str, cmd: &str, after: &[&str]) -> Self {
        self.raw.task.insert(
            name.to_string(),
            CommandTaskConfig {
                cmd: cmd.to_string(),
                after: after.iter().map(|a| a.to_string()).collect(),
            },
        );
        self
    }

    pub fn build(self) -> SiteConfig {
        SiteConfig::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

/// Minimal project in the built-in layout: a template, three pages, a style
/// sheet with an import, two scripts and a graphic.
pub struct SiteFixture;

pub const TEMPLATE: &str = "<html><body>{{ contents }}</body></html>";

impl SiteFixture {
    pub const PAGES: [(&'static str, &'static str); 3] = [
        ("index.md", "# Home"),
        ("about.md", "About *us*"),
        ("contact.md", "Mail us"),
    ];

    /// Populate an in-memory filesystem rooted at `.`.
    pub fn mock() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("template.html", TEMPLATE);
        for (name, text) in Self::PAGES {
            fs.add_file(format!("md/{name}"), text);
        }
        fs.add_file("css/site.css", "@import \"base.css\";\nbody { margin: 0; }\n");
        fs.add_file("css/base.css", "h1 { color: teal; }\n");
        fs.add_file("scripts/app.js", "// entry\nconst x = 1;\n");
        fs.add_file("scripts/util.js", "function id(v) {\n  return v;\n}\n");
        fs.add_file("graphics/logo.svg", "<svg/>");
        fs
    }

    /// Write the same project to a real directory.
    pub fn write_to(root: &Path) -> std::io::Result<()> {
        let files: Vec<(String, &str)> = vec![
            ("template.html".into(), TEMPLATE),
            ("md/index.md".into(), Self::PAGES[0].1),
            ("md/about.md".into(), Self::PAGES[1].1),
            ("md/contact.md".into(), Self::PAGES[2].1),
            ("css/site.css".into(), "@import \"base.css\";\nbody { margin: 0; }\n"),
            ("css/base.css".into(), "h1 { color: teal; }\n"),
            ("scripts/app.js".into(), "// entry\nconst x = 1;\n"),
            ("scripts/util.js".into(), "function id(v) {\n  return v;\n}\n"),
            ("graphics/logo.svg".into(), "<svg/>"),
        ];
        for (rel, text) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, text)?;
        }
        Ok(())
    }
}
