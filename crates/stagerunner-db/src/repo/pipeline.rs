//! Pipeline repository.

use async_trait::async_trait;
use stagerunner_core::{Pipeline, ResourceId};

use crate::DbResult;

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Fails with `Duplicate` if a pipeline with the same ID exists.
    async fn create_pipeline(&self, pipeline: &Pipeline) -> DbResult<()>;
    async fn get_pipeline(&self, id: ResourceId) -> DbResult<Pipeline>;
    /// Replace a stored pipeline. Fails with `NotFound` if it does not exist.
    async fn update_pipeline(&self, pipeline: &Pipeline) -> DbResult<()>;
    async fn delete_pipeline(&self, id: ResourceId) -> DbResult<()>;
    async fn list_pipelines(&self) -> DbResult<Vec<Pipeline>>;
}
