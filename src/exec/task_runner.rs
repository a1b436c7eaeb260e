// src/exec/task_runner.rs

//! Runs a single task action and reports the outcome to the runtime.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RuntimeEvent, TaskAction, TaskName, TaskOutcome};

/// Run one task action to completion and emit exactly one `TaskCompleted`
/// event for it.
///
/// The action is started inside its own Tokio task, so a panic while building
/// or polling its future is turned into a failed outcome instead of tearing
/// down the runtime.
pub async fn run_task(
    name: TaskName,
    action: Arc<dyn TaskAction>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(task = %name, "starting task");
    let started = Instant::now();

    let outcome = match tokio::spawn(async move { action.run().await }).await {
        Ok(Ok(())) => {
            info!(
                task = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
            TaskOutcome::Success
        }
        Ok(Err(err)) => {
            let message = format!("{err:#}");
            error!(
                task = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %message,
                "task failed"
            );
            TaskOutcome::Failed(message)
        }
        Err(join_err) => {
            let reason = if join_err.is_panic() {
                "task action panicked".to_string()
            } else {
                format!("task action was cancelled: {join_err}")
            };
            error!(task = %name, error = %reason, "task aborted");
            TaskOutcome::Failed(reason)
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %name, "runtime event channel closed before completion was reported");
    }
}
