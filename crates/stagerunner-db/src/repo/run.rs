//! Pipeline run repository.

use async_trait::async_trait;
use stagerunner_core::{PipelineRun, ResourceId};

use crate::DbResult;

#[async_trait]
pub trait PipelineRunStore: Send + Sync {
    async fn create_pipeline_run(&self, run: &PipelineRun) -> DbResult<()>;
    async fn get_pipeline_run(&self, id: ResourceId) -> DbResult<PipelineRun>;
    async fn update_pipeline_run(&self, run: &PipelineRun) -> DbResult<()>;
    /// All runs, oldest first.
    async fn list_pipeline_runs(&self) -> DbResult<Vec<PipelineRun>>;

    /// Runs of a single pipeline, oldest first.
    async fn list_runs_for_pipeline(&self, pipeline_id: ResourceId) -> DbResult<Vec<PipelineRun>> {
        let runs = self.list_pipeline_runs().await?;
        Ok(runs
            .into_iter()
            .filter(|run| run.pipeline_id == pipeline_id)
            .collect())
    }
}
