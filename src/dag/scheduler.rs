use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::plan::Plan;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Scheduler holds the immutable DAG of one validated plan plus the mutable
/// state of a single run.
///
/// It is responsible for:
/// - tracking the in-degree (unfinished dependencies) of every task
/// - deciding when a task is ready to run
/// - marking tasks as succeeded/failed
/// - skipping dependents when a task fails
///
/// It is a pure state machine: no Tokio, no channels, no IO. A fresh
/// scheduler is built for every run.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    started: bool,
    finished: bool,
}

impl Scheduler {
    /// Construct a scheduler for a validated [`Plan`]. Every task starts
    /// `Pending`.
    pub fn new(plan: &Plan) -> Self {
        let graph = plan.graph().clone();

        let tasks = graph
            .tasks()
            .map(|name| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.to_string(), TaskInfo::new(name.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            started: false,
            finished: false,
        }
    }

    /// Whether every task has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| info.run_state.into())
    }

    /// Number of dependencies of `task` that have not succeeded yet.
    pub fn remaining_deps(&self, task: &str) -> Option<usize> {
        self.tasks.get(task).map(|info| info.remaining_deps)
    }

    /// All task names in this run, sorted.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Snapshot of every task's state.
    pub fn states(&self) -> BTreeMap<TaskName, TaskRunState> {
        self.tasks
            .iter()
            .map(|(name, info)| (name.clone(), info.run_state.into()))
            .collect()
    }

    /// Launch the run: every task with no dependencies becomes `Running`.
    pub fn start(&mut self) -> Vec<ScheduledTask> {
        self.step_start().newly_scheduled
    }

    /// Handle completion of a task action with a concrete outcome.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `start` that returns a rich [`SchedulerStep`].
    pub fn step_start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;
        debug!(tasks = self.tasks.len(), "scheduler: starting run");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            run_just_finished,
            ..SchedulerStep::default()
        }
    }

    /// Manual-step variant of `handle_completion` that returns a rich
    /// [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };

        if info.run_state != RunState::Running {
            warn!(
                task = %task,
                state = ?info.run_state,
                "completion for task that is not running; ignoring"
            );
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = RunState::Succeeded;
                debug!(task = %task, "task completed successfully");
                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                manager.release_dependents(task);
                step.newly_scheduled = manager.collect_new_ready_tasks();
            }
            TaskOutcome::Failed(reason) => {
                info.run_state = RunState::Failed;
                warn!(
                    task = %task,
                    error = %reason,
                    "task failed; skipping dependents in this run"
                );
                step.newly_failed = Some(task.to_string());
                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                step.newly_skipped = manager.mark_dependents_skipped(task);
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Determine whether all tasks are terminal and flag the run as finished.
    ///
    /// Returns `true` if this call transitioned the run to finished.
    fn maybe_finish_run(&mut self) -> bool {
        if self.finished {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks);
        if manager.all_tasks_terminal() {
            info!("scheduler: all tasks terminal; run finished");
            self.finished = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn plan(pairs: &[(&str, Vec<&str>)], target: &str) -> Plan {
        let tasks: BTreeMap<TaskName, Vec<TaskName>> = pairs
            .iter()
            .map(|(n, d)| (n.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect();
        Plan::build(target, |name| tasks.get(name).map(|d| d.as_slice())).unwrap()
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    fn fan_in_plan() -> Plan {
        plan(
            &[
                ("clean", vec![]),
                ("css", vec![]),
                ("scripts", vec![]),
                ("graphics", vec![]),
                ("markdown", vec!["clean"]),
                ("default", vec!["clean", "css", "scripts", "graphics", "markdown"]),
            ],
            "default",
        )
    }

    #[test]
    fn independent_tasks_start_together() {
        let mut s = Scheduler::new(&fan_in_plan());
        assert_eq!(names(&s.start()), vec!["clean", "css", "graphics", "scripts"]);
        assert_eq!(s.run_state_of("markdown"), Some(TaskRunState::Pending));
        assert_eq!(s.remaining_deps("default"), Some(5));
    }

    #[test]
    fn dependent_is_launched_as_soon_as_its_own_deps_succeed() {
        let mut s = Scheduler::new(&fan_in_plan());
        s.start();

        let ready = s.handle_completion("clean", TaskOutcome::Success);
        assert_eq!(names(&ready), vec!["markdown"]);
        // css/scripts/graphics are still running; no wave barrier.
        assert_eq!(s.run_state_of("css"), Some(TaskRunState::Running));

        for t in ["css", "scripts", "graphics"] {
            assert!(s.handle_completion(t, TaskOutcome::Success).is_empty());
        }
        let ready = s.handle_completion("markdown", TaskOutcome::Success);
        assert_eq!(names(&ready), vec!["default"]);

        let step = s.step_completion("default", TaskOutcome::Success);
        assert!(step.run_just_finished);
        assert!(s.is_finished());
    }

    #[test]
    fn failure_skips_transitive_dependents_only() {
        let mut s = Scheduler::new(&fan_in_plan());
        s.start();

        let step = s.step_completion("clean", TaskOutcome::Failed("boom".into()));
        assert_eq!(step.newly_failed.as_deref(), Some("clean"));
        let mut skipped = step.newly_skipped.clone();
        skipped.sort();
        assert_eq!(skipped, vec!["default", "markdown"]);
        assert!(!step.run_just_finished);

        for t in ["css", "scripts", "graphics"] {
            s.handle_completion(t, TaskOutcome::Success);
        }
        assert!(s.is_finished());

        let states = s.states();
        assert_eq!(states["clean"], TaskRunState::Failed);
        assert_eq!(states["markdown"], TaskRunState::Skipped);
        assert_eq!(states["default"], TaskRunState::Skipped);
        assert_eq!(states["css"], TaskRunState::Succeeded);
    }

    #[test]
    fn stray_completions_are_ignored() {
        let mut s = Scheduler::new(&fan_in_plan());
        s.start();

        assert!(s.handle_completion("nope", TaskOutcome::Success).is_empty());
        // markdown is pending, not running.
        assert!(s.handle_completion("markdown", TaskOutcome::Success).is_empty());
        assert_eq!(s.run_state_of("markdown"), Some(TaskRunState::Pending));
    }

    #[test]
    fn single_task_run_finishes_after_its_completion() {
        let mut s = Scheduler::new(&plan(&[("only", vec![])], "only"));
        assert_eq!(names(&s.start()), vec!["only"]);
        assert!(!s.is_finished());
        s.handle_completion("only", TaskOutcome::Success);
        assert!(s.is_finished());
    }
}
