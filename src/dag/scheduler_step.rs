// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// The async runtime uses it to dispatch work and log skips; tests use it to
/// manually step the DAG and make assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Task that was marked failed in this step, if any.
    pub newly_failed: Option<TaskName>,
    /// Dependents of a failed task that will never start.
    pub newly_skipped: Vec<TaskName>,
    /// Whether this step caused the run to finish (every task terminal).
    pub run_just_finished: bool,
}
