// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::errors::{Result, SitedagError};
use crate::exec::ExecutorBackend;

use super::{RunReport, RuntimeEvent, TaskName, TaskOutcome};

/// Drives the DAG scheduler in response to `RuntimeEvent`s, and delegates
/// actual task execution to an `ExecutorBackend`.
///
/// The runtime is the only writer of the run's outcome map: completions from
/// concurrently running tasks are serialized through the event channel and
/// applied one at a time. Its only suspension point is waiting for the next
/// completion event.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    target: TaskName,
    failures: BTreeMap<TaskName, String>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        target: impl Into<TaskName>,
        scheduler: Scheduler,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            executor,
            target: target.into(),
            failures: BTreeMap::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Launches every task without dependencies.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the
    ///   scheduler.
    /// - Dispatches newly ready tasks as soon as they become ready.
    /// - Returns the run report once every task is terminal.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(target = %self.target, "sitedag runtime started");

        let step = self.scheduler.step_start();
        self.apply_step(step).await?;

        while !self.scheduler.is_finished() {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    return Err(SitedagError::Other(anyhow::anyhow!(
                        "runtime event channel closed before all tasks finished"
                    )));
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::TaskCompleted { task, outcome } => {
                    let reason = match &outcome {
                        TaskOutcome::Failed(reason) => Some(reason.clone()),
                        TaskOutcome::Success => None,
                    };
                    let step = self.scheduler.step_completion(&task, outcome);
                    if let (Some(failed), Some(reason)) = (&step.newly_failed, reason) {
                        self.failures.insert(failed.clone(), reason);
                    }
                    self.apply_step(step).await?;
                }
            }
        }

        let report = RunReport {
            target: self.target,
            states: self.scheduler.states(),
            failures: self.failures,
        };

        info!(
            succeeded = report.succeeded().len(),
            failed = report.failed().len(),
            skipped = report.skipped().len(),
            "runtime exiting"
        );
        Ok(report)
    }

    async fn apply_step(&mut self, step: SchedulerStep) -> Result<()> {
        for skipped in &step.newly_skipped {
            warn!(task = %skipped, "task skipped because a dependency failed");
        }
        self.spawn_ready(step.newly_scheduled).await
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
