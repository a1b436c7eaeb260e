// src/engine/action.rs

//! The unit of work a task executes.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by a [`TaskAction`].
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Something a task can run: "no input" to "completion or failure".
///
/// Closures returning a future implement this automatically, so
/// `|| async { Ok(()) }` style actions can be registered directly. Each call
/// to [`TaskAction::run`] must produce an independent future, since an
/// orchestrator may be run more than once.
pub trait TaskAction: Send + Sync {
    fn run(&self) -> ActionFuture;
}

impl<F, Fut> TaskAction for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run(&self) -> ActionFuture {
        Box::pin(self())
    }
}

/// Action that does nothing; used for aggregate targets such as `default`.
pub fn noop() -> impl TaskAction {
    || async { Ok::<(), anyhow::Error>(()) }
}
