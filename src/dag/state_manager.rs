// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DagGraph, tasks: &'a mut HashMap<TaskName, TaskInfo>) -> Self {
        Self { graph, tasks }
    }

    /// Record that `succeeded` finished: decrement the in-degree of each of
    /// its direct dependents.
    pub fn release_dependents(&mut self, succeeded: &str) {
        for dep_name in self.graph.dependents_of(succeeded) {
            match self.tasks.get_mut(dep_name) {
                Some(info) => {
                    info.remaining_deps = info.remaining_deps.saturating_sub(1);
                    debug!(
                        task = %info.name,
                        remaining = info.remaining_deps,
                        "dependency succeeded"
                    );
                }
                None => {
                    warn!(task = %dep_name, "node in DAG not present in tasks map");
                }
            }
        }
    }

    /// Mark every direct or transitive dependent of a failed task as
    /// `Skipped`.
    ///
    /// Returns the tasks newly marked as skipped (excluding the failed task
    /// itself).
    pub fn mark_dependents_skipped(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                match info.run_state {
                    RunState::Pending => {
                        info.run_state = RunState::Skipped;
                        debug!(
                            task = %info.name,
                            upstream = %failed_task,
                            "skipping task due to upstream failure"
                        );
                        newly_skipped.push(info.name.clone());
                        stack.extend(self.graph.dependents_of(&name).iter().cloned());
                    }
                    // A dependent can only leave Pending once all its deps
                    // succeeded, so anything else is already settled.
                    RunState::Running
                    | RunState::Succeeded
                    | RunState::Failed
                    | RunState::Skipped => {}
                }
            }
        }

        newly_skipped
    }

    /// Collect tasks that are `Pending` with an in-degree of zero, mark them
    /// as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        // Decide first, then mutate to avoid borrowing issues.
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| info.run_state == RunState::Pending && info.remaining_deps == 0)
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info!(task = %info.name, "dependencies satisfied; scheduling task");
                info.run_state = RunState::Running;
                ready.push(ScheduledTask::from_task_info(info));
            }
        }

        ready
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }
}
