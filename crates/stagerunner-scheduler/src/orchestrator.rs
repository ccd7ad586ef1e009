//! Run orchestrator: admission on trigger, then dispatch to a worker pool.

use futures::future::join_all;
use stagerunner_config::SchedulerConfig;
use stagerunner_core::executor::StageExecutor;
use stagerunner_core::{Pipeline, PipelineRun, RunStatus, StageKind};
use stagerunner_db::Store;
use stagerunner_executor::SimulatedExecutor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::guard::ActivePipelines;
use crate::queue::{AdmissionQueue, QueueError};
use crate::worker::Worker;
use crate::{SchedulerError, SchedulerResult};

/// Accepts triggered runs and executes them in the background.
pub struct RunOrchestrator {
    store: Arc<dyn Store>,
    stage_executor: Arc<dyn StageExecutor>,
    queue: AdmissionQueue,
    active: ActivePipelines,
    workers: usize,
    poll_interval: Duration,
}

impl RunOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        stage_executor: Arc<dyn StageExecutor>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            stage_executor,
            queue: AdmissionQueue::new(config.queue_size, config.max_queued_per_pipeline),
            active: ActivePipelines::new(),
            workers: config.workers,
            poll_interval: config.poll_interval,
        }
    }

    /// Orchestrator using simulated stages with the configured delay and
    /// failure rate.
    pub fn from_config(store: Arc<dyn Store>, config: &SchedulerConfig) -> Self {
        let executor = SimulatedExecutor::random(config.stage_delay, config.failure_rate);
        Self::new(store, Arc::new(executor), config)
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn active_pipelines(&self) -> &ActivePipelines {
        &self.active
    }

    /// Create a pending run of `pipeline` for `git_ref`, persist it and admit
    /// it to the queue.
    ///
    /// A run rejected by the queue is stored as `failed` and the rejection
    /// is returned.
    pub async fn trigger_pipeline(
        &self,
        pipeline: &Pipeline,
        git_ref: impl Into<String>,
    ) -> SchedulerResult<PipelineRun> {
        let mut run = PipelineRun::new(pipeline.id, git_ref);
        self.store.create_pipeline_run(&run).await?;

        if let Err(e) = self.queue.enqueue(run.clone()) {
            warn!(pipeline_id = %pipeline.id, run_id = %run.id, error = %e, "Pipeline run rejected");
            run.log(StageKind::Run, RunStatus::Failed, e.to_string());
            run.set_status(RunStatus::Failed);
            run.touch();
            if let Err(store_err) = self.store.update_pipeline_run(&run).await {
                error!(run_id = %run.id, error = %store_err, "Failed to persist rejected pipeline run");
            }
            return Err(e.into());
        }

        info!(pipeline_id = %pipeline.id, run_id = %run.id, git_ref = %run.git_ref, "Pipeline run queued");
        Ok(run)
    }

    /// Start the workers and dispatch queued runs until `cancel` fires.
    ///
    /// Returns once every worker has stopped. Workers finish the run they are
    /// executing first. A run dequeued but not yet accepted by a worker when
    /// cancellation arrives stays `pending` in the store.
    pub async fn start(&self, cancel: CancellationToken) -> SchedulerResult<()> {
        let (tx, rx) = mpsc::channel::<PipelineRun>(1);
        let handoff = Arc::new(Mutex::new(rx));
        let worker_cancel = cancel.child_token();

        info!(workers = self.workers, "Starting dispatcher");
        let handles: Vec<_> = (0..self.workers)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    self.store.clone(),
                    self.stage_executor.clone(),
                    self.active.clone(),
                    self.poll_interval,
                );
                let handoff = handoff.clone();
                let cancel = worker_cancel.clone();
                tokio::spawn(async move { worker.run(handoff, cancel).await })
            })
            .collect();

        let result = loop {
            let run = match self.queue.dequeue() {
                Ok(run) => run,
                Err(QueueError::Empty) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break Ok(()),
                        _ = sleep(self.poll_interval) => continue,
                    }
                }
                Err(e) => {
                    error!(error = %e, "Dequeue failed, stopping dispatcher");
                    break Err(SchedulerError::Dispatcher(e.to_string()));
                }
            };

            let run_id = run.id;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(run_id = %run_id, "Dispatcher cancelled, run left pending");
                    break Ok(());
                }
                sent = tx.send(run) => {
                    if sent.is_err() {
                        break Err(SchedulerError::Dispatcher("all workers have stopped".to_string()));
                    }
                }
            }
        };

        worker_cancel.cancel();
        drop(tx);
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task failed");
            }
        }
        info!("Dispatcher stopped");

        result
    }
}
