// src/dag/task_info.rs

//! Task metadata and per-run state.

use crate::engine::TaskName;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for dependencies to succeed.
    Pending,
    /// Dispatched to the executor.
    Running,
    Succeeded,
    /// The task's own action failed.
    Failed,
    /// Never started because a (transitive) dependency failed.
    Skipped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed | RunState::Skipped)
    }
}

/// Public, read-only view of a task's per-run state.
///
/// This is exposed for reports, tests and diagnostics without leaking the
/// internal `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl From<RunState> for TaskRunState {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Pending => TaskRunState::Pending,
            RunState::Running => TaskRunState::Running,
            RunState::Succeeded => TaskRunState::Succeeded,
            RunState::Failed => TaskRunState::Failed,
            RunState::Skipped => TaskRunState::Skipped,
        }
    }
}

impl std::fmt::Display for TaskRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskRunState::Pending => "pending",
            TaskRunState::Running => "running",
            TaskRunState::Succeeded => "succeeded",
            TaskRunState::Failed => "failed",
            TaskRunState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Static task information derived from the plan, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct dependencies for this task.
    pub deps: Vec<TaskName>,
    /// Number of dependencies that have not succeeded yet (the in-degree).
    pub remaining_deps: usize,
    pub run_state: RunState,
}

impl TaskInfo {
    pub fn new(name: TaskName, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            remaining_deps: deps.len(),
            deps,
            run_state: RunState::Pending,
        }
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo) -> Self {
        Self {
            name: info.name.clone(),
        }
    }
}
