// src/pipeline/mod.rs

//! The site build pipeline.
//!
//! A stage is a task whose action is a file-set transformation:
//! [`source`] selects files, [`transform`] defines the per-file step,
//! [`stage`] drives read → transform → write for each file, and [`site`]
//! wires the concrete stages into an [`crate::engine::Orchestrator`].

pub mod clean;
pub mod site;
pub mod source;
pub mod stage;
pub mod transform;
pub mod transforms;

pub use clean::Cleaner;
pub use site::build_orchestrator;
pub use source::{SourceEntry, SourceSet};
pub use stage::{FileStage, StageReport};
pub use transform::{Chain, OutputFile, SetExtension, SourceFile, Transform, Verbatim};
