//! Core domain types and traits for the stagerunner pipeline service.
//!
//! This crate contains:
//! - Resource identifiers and the shared error type
//! - The closed set of stage kinds and their validation rules
//! - Pipeline definitions and pipeline run records
//! - The stage executor and outcome provider traits

pub mod error;
pub mod executor;
pub mod id;
pub mod pipeline;
pub mod stage;

pub use error::{Error, Result};
pub use id::ResourceId;
pub use pipeline::{LogEntry, Pipeline, PipelineDefinition, PipelineRun, RunStatus};
pub use stage::{BuildStage, DeployStage, RunStage, Stage, StageKind, Stages};
