// src/pipeline/site.rs

//! The static-site task graph.
//!
//! | task       | action                                  | depends on      |
//! |------------|-----------------------------------------|-----------------|
//! | `clean`    | remove the build and dist roots         |                 |
//! | `css`      | inline `@import`s into `build/css`      | `clean`         |
//! | `scripts`  | minify into `build/scripts`             | `clean`         |
//! | `graphics` | copy into `dist/graphics`               | `clean`         |
//! | `markdown` | render pages into `dist`                | the four above  |
//! | `default`  | nothing                                 | all of the above|
//!
//! Every stage writes below an output root that `clean` removes, so all of
//! them wait for it. The three asset stages then run concurrently, and pages
//! are rendered last. Command tasks from `[task.<name>]` are registered
//! alongside.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::SiteConfig;
use crate::engine::{ActionFuture, Orchestrator, TaskAction, noop};
use crate::errors::{Result, StageFailed};
use crate::exec::CommandAction;
use crate::fs::FileSystem;
use crate::pipeline::clean::Cleaner;
use crate::pipeline::stage::FileStage;
use crate::pipeline::transform::{Transform, Verbatim};
use crate::pipeline::transforms::{CssImports, Minify, PageTemplate};

pub const CLEAN: &str = "clean";
pub const CSS: &str = "css";
pub const SCRIPTS: &str = "scripts";
pub const GRAPHICS: &str = "graphics";
pub const MARKDOWN: &str = "markdown";
pub const DEFAULT: &str = "default";

/// Built-in task names in registration order.
pub const BUILTIN_TASKS: [&str; 6] = [CLEAN, CSS, SCRIPTS, GRAPHICS, MARKDOWN, DEFAULT];

/// A file stage bound to its source glob, destination and transform.
#[derive(Clone)]
struct StageTask {
    stage: FileStage,
    source_glob: String,
    destination: PathBuf,
    transform: Arc<dyn Transform>,
}

impl StageTask {
    async fn execute(self) -> anyhow::Result<()> {
        let report = self
            .stage
            .run(&self.source_glob, &self.destination, self.transform)
            .await?;
        report.into_result(self.stage.name())?;
        Ok(())
    }
}

impl TaskAction for StageTask {
    fn run(&self) -> ActionFuture {
        Box::pin(self.clone().execute())
    }
}

/// The page stage; loads the template fresh on every run.
#[derive(Debug, Clone)]
struct PageTask {
    stage: FileStage,
    content_glob: String,
    destination: PathBuf,
    template: PathBuf,
    extension: String,
    pretty: bool,
}

impl PageTask {
    async fn execute(self) -> anyhow::Result<()> {
        let template = PageTemplate::load(self.stage.fs().as_ref(), &self.template, &self.extension)
            .map_err(|failure| StageFailed {
                stage: self.stage.name().to_string(),
                failures: vec![failure],
            })?
            .with_pretty(self.pretty);

        let report = self
            .stage
            .run(&self.content_glob, &self.destination, Arc::new(template))
            .await?;
        report.into_result(self.stage.name())?;
        Ok(())
    }
}

impl TaskAction for PageTask {
    fn run(&self) -> ActionFuture {
        Box::pin(self.clone().execute())
    }
}

/// Register every site task for the project rooted at `root`.
pub fn build_orchestrator(config: &SiteConfig, root: &Path, fs: Arc<dyn FileSystem>) -> Result<Orchestrator> {
    let paths = config.paths();
    let build = PathBuf::from(&paths.build);
    let dist = PathBuf::from(&paths.dist);
    let stage = |name: &str| FileStage::new(name, Arc::clone(&fs), root);

    let mut orch = Orchestrator::new();

    let cleaner = Cleaner::new(Arc::clone(&fs), vec![root.join(&build), root.join(&dist)]);
    orch.register(
        CLEAN,
        move || {
            let cleaner = cleaner.clone();
            async move { cleaner.run().await }
        },
        &[],
    )?;

    orch.register(
        CSS,
        StageTask {
            stage: stage(CSS),
            source_glob: paths.styles.clone(),
            destination: build.join("css"),
            transform: Arc::new(CssImports::new(Arc::clone(&fs))),
        },
        &[CLEAN],
    )?;

    orch.register(
        SCRIPTS,
        StageTask {
            stage: stage(SCRIPTS),
            source_glob: paths.scripts.clone(),
            destination: build.join("scripts"),
            transform: Arc::new(Minify),
        },
        &[CLEAN],
    )?;

    orch.register(
        GRAPHICS,
        StageTask {
            stage: stage(GRAPHICS),
            source_glob: paths.graphics.clone(),
            destination: dist.join("graphics"),
            transform: Arc::new(Verbatim),
        },
        &[CLEAN],
    )?;

    orch.register(
        MARKDOWN,
        PageTask {
            stage: stage(MARKDOWN),
            content_glob: paths.content.clone(),
            destination: dist.clone(),
            template: root.join(&paths.template),
            extension: config.pages().extension.clone(),
            pretty: config.pages().pretty,
        },
        &[CLEAN, CSS, SCRIPTS, GRAPHICS],
    )?;

    orch.register(DEFAULT, noop(), &[CLEAN, CSS, SCRIPTS, GRAPHICS, MARKDOWN])?;

    for (name, task) in config.tasks() {
        let deps: Vec<&str> = task.after.iter().map(String::as_str).collect();
        debug!(task = %name, cmd = %task.cmd, "registering command task");
        orch.register(
            name.clone(),
            CommandAction::new(name.clone(), task.cmd.clone(), root.to_path_buf()),
            &deps,
        )?;
    }

    Ok(orch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandTaskConfig, PagesSection, PathsSection};
    use crate::errors::SitedagError;
    use crate::fs::mock::MockFileSystem;
    use std::collections::BTreeMap;

    fn mock() -> Arc<dyn FileSystem> {
        Arc::new(MockFileSystem::new())
    }

    #[test]
    fn builtin_graph_shape() {
        let orch = build_orchestrator(&SiteConfig::default(), Path::new("."), mock()).unwrap();
        let names: Vec<&str> = orch.task_names().collect();
        for builtin in BUILTIN_TASKS {
            assert!(names.contains(&builtin), "missing {builtin}");
        }
        assert_eq!(
            orch.dependencies_of(MARKDOWN).unwrap(),
            &[CLEAN, CSS, SCRIPTS, GRAPHICS].map(String::from)
        );
        assert_eq!(orch.dependencies_of(CSS).unwrap(), &[CLEAN.to_string()]);

        let waves = orch.plan(DEFAULT).unwrap().waves();
        assert_eq!(
            waves,
            vec![
                vec!["clean"],
                vec!["css", "graphics", "scripts"],
                vec!["markdown"],
                vec!["default"],
            ]
        );
    }

    #[test]
    fn command_tasks_join_the_graph() {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            "deploy".to_string(),
            CommandTaskConfig {
                cmd: "true".into(),
                after: vec![DEFAULT.into()],
            },
        );
        let cfg = SiteConfig::new_unchecked(PathsSection::default(), PagesSection::default(), tasks);

        let orch = build_orchestrator(&cfg, Path::new("."), mock()).unwrap();
        let plan = orch.plan("deploy").unwrap();
        assert_eq!(plan.graph().len(), BUILTIN_TASKS.len() + 1);
    }

    #[test]
    fn command_task_cannot_shadow_a_builtin() {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            CLEAN.to_string(),
            CommandTaskConfig {
                cmd: "rm -rf out".into(),
                after: vec![],
            },
        );
        let cfg = SiteConfig::new_unchecked(PathsSection::default(), PagesSection::default(), tasks);

        let err = build_orchestrator(&cfg, Path::new("."), mock()).unwrap_err();
        assert!(matches!(err, SitedagError::DuplicateTask(name) if name == CLEAN));
    }
}
