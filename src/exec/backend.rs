// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning actions
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation here.
//!
//! - `RealExecutorBackend` is the default implementation used by `sitedag`.
//!   It spawns each scheduled task's registered action on the Tokio runtime
//!   and reports its completion over the runtime event channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::error;

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskAction, TaskName, TaskOutcome};
use crate::errors::{Error, Result};

use super::task_runner::run_task;

/// Trait abstracting how scheduled tasks are executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't run real actions.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Implementations must eventually emit exactly one
    /// `RuntimeEvent::TaskCompleted` per dispatched task, and must not block
    /// until the tasks finish.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    actions: HashMap<TaskName, Arc<dyn TaskAction>>,
}

impl RealExecutorBackend {
    /// Create a new backend that runs the given actions and reports to the
    /// given runtime event sender.
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        actions: HashMap<TaskName, Arc<dyn TaskAction>>,
    ) -> Self {
        Self { runtime_tx, actions }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                let tx = self.runtime_tx.clone();

                match self.actions.get(&task.name) {
                    Some(action) => {
                        tokio::spawn(run_task(task.name, Arc::clone(action), tx));
                    }
                    None => {
                        error!(task = %task.name, "no action registered for scheduled task");
                        tx.send(RuntimeEvent::TaskCompleted {
                            outcome: TaskOutcome::Failed(format!(
                                "no action registered for task '{}'",
                                task.name
                            )),
                            task: task.name,
                        })
                        .await
                        .map_err(Error::from)?;
                    }
                }
            }
            Ok(())
        })
    }
}
