//! Worker that executes handed-off runs to a terminal status.

use stagerunner_core::executor::StageExecutor;
use stagerunner_core::{PipelineRun, RunStatus, StageKind};
use stagerunner_db::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::guard::{ActivePipelines, PipelineSlot};

/// Receiving end of the dispatcher handoff, shared by every worker.
pub type Handoff = Arc<Mutex<mpsc::Receiver<PipelineRun>>>;

/// A worker that executes one run at a time.
pub struct Worker {
    id: usize,
    store: Arc<dyn Store>,
    stage_executor: Arc<dyn StageExecutor>,
    active: ActivePipelines,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        id: usize,
        store: Arc<dyn Store>,
        stage_executor: Arc<dyn StageExecutor>,
        active: ActivePipelines,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            store,
            stage_executor,
            active,
            poll_interval,
        }
    }

    /// Run the worker loop until `cancel` fires or the handoff closes.
    ///
    /// A run that is already executing is finished before cancellation is
    /// observed.
    pub async fn run(&self, handoff: Handoff, cancel: CancellationToken) {
        info!(worker_id = self.id, "Starting worker");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                run = async { handoff.lock().await.recv().await } => run,
            };

            let Some(run) = next else {
                break;
            };

            info!(worker_id = self.id, run_id = %run.id, "Picked up next pipeline run");
            self.execute(run).await;
        }

        info!(worker_id = self.id, "Worker stopped");
    }

    /// Drive `run` through every stage and persist the result.
    pub async fn execute(&self, mut run: PipelineRun) {
        let pipeline = match self.store.get_pipeline(run.pipeline_id).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                run.log(
                    StageKind::Run,
                    RunStatus::Failed,
                    format!("error getting pipeline from store: {}", e),
                );
                run.set_status(RunStatus::Failed);
                self.persist(&mut run).await;
                return;
            }
        };

        // Held until the terminal status is persisted.
        let _slot = self.acquire(&mut run).await;

        run.set_status(RunStatus::Running);
        self.persist(&mut run).await;

        for kind in StageKind::ALL {
            let stage = pipeline.stages.get(kind);

            if let Err(e) = self.stage_executor.execute(&mut run, &stage).await {
                warn!(run_id = %run.id, stage = %kind, error = %e, "Stage failed");
                if kind.is_last() || !stage.continue_on_error() {
                    run.set_status(RunStatus::Failed);
                    self.persist(&mut run).await;
                    return;
                }
                debug!(run_id = %run.id, stage = %kind, "Continuing after stage failure");
            }

            self.persist(&mut run).await;
        }

        run.set_status(RunStatus::Success);
        self.persist(&mut run).await;
        info!(run_id = %run.id, pipeline_id = %run.pipeline_id, "Pipeline run succeeded");
    }

    /// Wait until no other run of the same pipeline is executing.
    ///
    /// Waiting runs poll, so when several runs of one pipeline are waiting
    /// the next one to start is whichever checks first.
    async fn acquire(&self, run: &mut PipelineRun) -> PipelineSlot {
        let mut last_blocker = None;
        loop {
            match self.active.try_acquire(run.pipeline_id, run.id) {
                Ok(slot) => return slot,
                Err(blocker) => {
                    if last_blocker != Some(blocker) {
                        run.log(
                            StageKind::Run,
                            RunStatus::Pending,
                            format!("waiting for previous run {} to finish", blocker),
                        );
                        self.persist(run).await;
                        last_blocker = Some(blocker);
                    }
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Store the current state of `run`. Failures are logged only.
    async fn persist(&self, run: &mut PipelineRun) {
        run.touch();
        if let Err(e) = self.store.update_pipeline_run(run).await {
            error!(run_id = %run.id, error = %e, "Failed to persist pipeline run");
        }
    }
}
