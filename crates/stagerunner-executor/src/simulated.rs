//! Simulated stage executor.
//!
//! Stands in for real side effects (running a command, building an image,
//! applying a manifest). Every stage kind follows the same shape: validate,
//! log the parameters, ask the outcome provider, then sleep for `delay`.

use async_trait::async_trait;
use stagerunner_core::executor::{OutcomeProvider, StageExecutor, StageOutcome};
use stagerunner_core::{Error, PipelineRun, Result, RunStatus, Stage};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::outcome::RandomOutcome;

pub struct SimulatedExecutor {
    delay: Duration,
    outcomes: Arc<dyn OutcomeProvider>,
}

impl SimulatedExecutor {
    pub fn new(delay: Duration, outcomes: Arc<dyn OutcomeProvider>) -> Self {
        Self { delay, outcomes }
    }

    /// Executor failing each stage with probability `failure_rate`.
    pub fn random(delay: Duration, failure_rate: f64) -> Self {
        Self::new(delay, Arc::new(RandomOutcome::new(failure_rate)))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl StageExecutor for SimulatedExecutor {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn execute(&self, run: &mut PipelineRun, stage: &Stage) -> Result<()> {
        let kind = stage.kind();

        if let Err(e) = stage.validate() {
            run.set_stage_status(kind, RunStatus::Failed);
            run.log(kind, RunStatus::Failed, e.to_string());
            return Err(e);
        }

        run.set_stage_status(kind, RunStatus::Running);
        run.log(kind, RunStatus::Running, "starting...");
        run.log(kind, RunStatus::Running, stage.describe());

        if self.outcomes.outcome(run, kind) == StageOutcome::Fail {
            run.log(kind, RunStatus::Failed, "failed");
            run.set_stage_status(kind, RunStatus::Failed);
            return Err(Error::ExecutionFailed(format!("{} stage failed", kind)));
        }

        debug!(run_id = %run.id, stage = %kind, delay_ms = self.delay.as_millis() as u64, "simulating stage");
        tokio::time::sleep(self.delay).await;

        run.log(kind, RunStatus::Success, "finished");
        run.set_stage_status(kind, RunStatus::Success);
        Ok(())
    }
}
