// src/engine/mod.rs

//! Orchestration engine for sitedag.
//!
//! This module ties together:
//! - the task registry ([`Orchestrator`]) where named actions and their
//!   dependencies are declared
//! - the pure DAG scheduler (see [`crate::dag`])
//! - the async runtime loop that reacts to task completion events and
//!   dispatches newly ready tasks to an executor backend
//!
//! The registry lives in [`orchestrator`]; the async/IO shell is implemented
//! in [`runtime`]; the action abstraction in [`action`].

use std::collections::BTreeMap;

use crate::dag::TaskRunState;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a single task action, as reported to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The action returned an error (or panicked); carries the rendered error.
    Failed(String),
}

/// Events flowing into the runtime from the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task action finished with a concrete outcome.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
}

/// Final result of one orchestrator run.
///
/// Every task reachable from the target appears in `states` exactly once.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub target: TaskName,
    pub states: BTreeMap<TaskName, TaskRunState>,
    /// Error message per failed task.
    pub failures: BTreeMap<TaskName, String>,
}

impl RunReport {
    /// True if every task in the run succeeded.
    pub fn is_success(&self) -> bool {
        self.states
            .values()
            .all(|state| *state == TaskRunState::Succeeded)
    }

    pub fn state_of(&self, task: &str) -> Option<TaskRunState> {
        self.states.get(task).copied()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.with_state(TaskRunState::Failed)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.with_state(TaskRunState::Skipped)
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.with_state(TaskRunState::Succeeded)
    }

    fn with_state(&self, wanted: TaskRunState) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, state)| **state == wanted)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

pub mod action;
pub mod orchestrator;
pub mod runtime;

pub use action::{ActionFuture, TaskAction, noop};
pub use orchestrator::Orchestrator;
pub use runtime::Runtime;
