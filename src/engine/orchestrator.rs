// src/engine/orchestrator.rs

//! Task registry and the `run(target)` entry point.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{Plan, Scheduler};
use crate::errors::{Result, SitedagError};
use crate::exec::RealExecutorBackend;

use super::{RunReport, Runtime, RuntimeEvent, TaskAction, TaskName};

struct RegisteredTask {
    action: Arc<dyn TaskAction>,
    deps: Vec<TaskName>,
}

/// Holds a set of named tasks and runs them respecting their dependencies.
///
/// Registration and execution are separate phases: tasks are registered once,
/// then [`Orchestrator::run`] may be called any number of times, each call
/// starting from a fresh outcome map.
#[derive(Default)]
pub struct Orchestrator {
    tasks: BTreeMap<TaskName, RegisteredTask>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deps: BTreeMap<&str, &[TaskName]> = self
            .tasks
            .iter()
            .map(|(name, task)| (name.as_str(), task.deps.as_slice()))
            .collect();
        f.debug_struct("Orchestrator").field("tasks", &deps).finish()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task.
    ///
    /// Dependencies do not need to be registered yet; they are checked when
    /// a plan is built, before anything executes. Repeated dependency names
    /// count once.
    pub fn register<A>(&mut self, name: impl Into<TaskName>, action: A, depends_on: &[&str]) -> Result<()>
    where
        A: TaskAction + 'static,
    {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(SitedagError::DuplicateTask(name));
        }

        let mut deps: Vec<TaskName> = Vec::with_capacity(depends_on.len());
        for dep in depends_on {
            if !deps.iter().any(|d| d == dep) {
                deps.push(dep.to_string());
            }
        }
        debug!(task = %name, ?deps, "registered task");

        self.tasks.insert(
            name,
            RegisteredTask {
                action: Arc::new(action),
                deps,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered task names, sorted.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Declared dependencies of a registered task.
    pub fn dependencies_of(&self, name: &str) -> Option<&[TaskName]> {
        self.tasks.get(name).map(|t| t.deps.as_slice())
    }

    /// Validate the subgraph reachable from `target` without running it.
    pub fn plan(&self, target: &str) -> Result<Plan> {
        Plan::build(target, |name| self.dependencies_of(name))
    }

    /// Execute `target` and, transitively, everything it depends on.
    ///
    /// Validation errors (unknown target, unknown dependency, cycle) are
    /// returned before any task runs. Task failures do not make this return
    /// an error; they are reported in the [`RunReport`].
    pub async fn run(&self, target: &str) -> Result<RunReport> {
        let plan = self.plan(target)?;
        info!(
            target = %target,
            tasks = plan.graph().len(),
            "starting run"
        );

        let actions: HashMap<TaskName, Arc<dyn TaskAction>> = plan
            .graph()
            .tasks()
            .filter_map(|name| {
                self.tasks
                    .get(name)
                    .map(|t| (name.to_string(), Arc::clone(&t.action)))
            })
            .collect();

        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
        let executor = RealExecutorBackend::new(rt_tx, actions);
        let scheduler = Scheduler::new(&plan);

        Runtime::new(target, scheduler, rt_rx, executor).run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::noop;

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut orch = Orchestrator::new();
        orch.register("clean", noop(), &[]).unwrap();
        match orch.register("clean", noop(), &[]) {
            Err(SitedagError::DuplicateTask(name)) => assert_eq!(name, "clean"),
            other => panic!("expected DuplicateTask, got {other:?}"),
        }
    }

    #[test]
    fn repeated_dependencies_count_once() {
        let mut orch = Orchestrator::new();
        orch.register("clean", noop(), &[]).unwrap();
        orch.register("deploy", noop(), &["clean", "clean"]).unwrap();
        assert_eq!(orch.dependencies_of("deploy").unwrap(), &["clean".to_string()]);
    }

    #[test]
    fn dependencies_may_be_registered_later() {
        let mut orch = Orchestrator::new();
        orch.register("markdown", noop(), &["clean"]).unwrap();
        assert!(matches!(
            orch.plan("markdown"),
            Err(SitedagError::UnknownDependency { .. })
        ));

        orch.register("clean", noop(), &[]).unwrap();
        let plan = orch.plan("markdown").unwrap();
        assert_eq!(plan.graph().len(), 2);
    }
}
