//! Run scheduling for stagerunner.
//!
//! Admits triggered runs into a bounded queue, hands them from a single
//! dispatcher to a fixed pool of workers, and drives each run through its
//! run, build and deploy stages with at most one running run per pipeline.

pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod queue;
pub mod worker;

pub use error::{SchedulerError, SchedulerResult};
pub use guard::{ActivePipelines, PipelineSlot};
pub use orchestrator::RunOrchestrator;
pub use queue::{AdmissionQueue, QueueError};
pub use worker::Worker;
