//! Stage executor trait and outcome types.
//!
//! A stage executor takes one stage of a run from `pending` to a terminal
//! stage status, writing its progress into the run's stage log. The scheduler
//! only relies on the returned `Result`: `Ok` means the stage succeeded, any
//! error is a stage failure subject to the stage's continue-on-error policy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineRun;
use crate::stage::{Stage, StageKind};
use crate::Result;

/// Decides whether a stage side effect succeeds.
///
/// Real side effects are out of scope; executors consult an outcome provider
/// instead so tests can script per-stage results.
pub trait OutcomeProvider: Send + Sync {
    fn outcome(&self, run: &PipelineRun, stage: StageKind) -> StageOutcome;
}

/// Result of a simulated stage side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    Succeed,
    Fail,
}

/// Trait for stage executors.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Name of this executor.
    fn name(&self) -> &'static str;

    /// Execute one stage of `run`, updating its stage status and log.
    async fn execute(&self, run: &mut PipelineRun, stage: &Stage) -> Result<()>;
}
