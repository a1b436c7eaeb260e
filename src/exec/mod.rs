// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running the actions of scheduled
//! tasks and reporting back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.
//! - [`task_runner`] runs one action and turns its result (or panic) into a
//!   `TaskCompleted` event.
//! - [`command`] implements shell-command actions for user-declared tasks.

pub mod backend;
pub mod command;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use command::CommandAction;
