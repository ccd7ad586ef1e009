//! In-memory store.
//!
//! Keeps owned copies of pipelines and runs in two maps guarded by a single
//! reader/writer lock. Callers always receive clones, so a record only
//! changes in the store through an explicit update.

use async_trait::async_trait;
use stagerunner_core::{Pipeline, PipelineRun, ResourceId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{DbError, DbResult, PipelineRunStore, PipelineStore};

#[derive(Default)]
struct Tables {
    pipelines: HashMap<ResourceId, Pipeline>,
    runs: HashMap<ResourceId, PipelineRun>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn create_pipeline(&self, pipeline: &Pipeline) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.pipelines.contains_key(&pipeline.id) {
            return Err(DbError::Duplicate(format!("pipeline {}", pipeline.id)));
        }
        tables.pipelines.insert(pipeline.id, pipeline.clone());
        debug!(pipeline_id = %pipeline.id, name = %pipeline.name, "pipeline created");
        Ok(())
    }

    async fn get_pipeline(&self, id: ResourceId) -> DbResult<Pipeline> {
        let tables = self.tables.read().await;
        tables
            .pipelines
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("pipeline {}", id)))
    }

    async fn update_pipeline(&self, pipeline: &Pipeline) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        match tables.pipelines.get_mut(&pipeline.id) {
            Some(existing) => {
                *existing = pipeline.clone();
                Ok(())
            }
            None => Err(DbError::NotFound(format!("pipeline {}", pipeline.id))),
        }
    }

    async fn delete_pipeline(&self, id: ResourceId) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .pipelines
            .remove(&id)
            .map(|_| debug!(pipeline_id = %id, "pipeline deleted"))
            .ok_or_else(|| DbError::NotFound(format!("pipeline {}", id)))
    }

    async fn list_pipelines(&self) -> DbResult<Vec<Pipeline>> {
        let tables = self.tables.read().await;
        let mut pipelines: Vec<Pipeline> = tables.pipelines.values().cloned().collect();
        pipelines.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(pipelines)
    }
}

#[async_trait]
impl PipelineRunStore for MemoryStore {
    async fn create_pipeline_run(&self, run: &PipelineRun) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.runs.contains_key(&run.id) {
            return Err(DbError::Duplicate(format!("pipeline run {}", run.id)));
        }
        tables.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn get_pipeline_run(&self, id: ResourceId) -> DbResult<PipelineRun> {
        let tables = self.tables.read().await;
        tables
            .runs
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("pipeline run {}", id)))
    }

    async fn update_pipeline_run(&self, run: &PipelineRun) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        match tables.runs.get_mut(&run.id) {
            Some(existing) => {
                *existing = run.clone();
                Ok(())
            }
            None => Err(DbError::NotFound(format!("pipeline run {}", run.id))),
        }
    }

    async fn list_pipeline_runs(&self) -> DbResult<Vec<PipelineRun>> {
        let tables = self.tables.read().await;
        let mut runs: Vec<PipelineRun> = tables.runs.values().cloned().collect();
        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagerunner_core::{
        BuildStage, DeployStage, PipelineDefinition, RunStage, RunStatus, Stages,
    };

    fn pipeline(name: &str) -> Pipeline {
        Pipeline::new(PipelineDefinition {
            name: name.to_string(),
            repository: "github.com/test/repo".to_string(),
            stages: Stages::new(
                RunStage::new("go test ./..."),
                BuildStage::new("Dockerfile"),
                DeployStage::new("prod", "k8s/"),
            ),
        })
    }

    #[tokio::test]
    async fn test_pipeline_crud() {
        let store = MemoryStore::new();
        let mut p = pipeline("test-pipeline");

        store.create_pipeline(&p).await.unwrap();
        assert_eq!(store.get_pipeline(p.id).await.unwrap(), p);

        p.name = "renamed".to_string();
        store.update_pipeline(&p).await.unwrap();
        assert_eq!(store.get_pipeline(p.id).await.unwrap().name, "renamed");

        store.delete_pipeline(p.id).await.unwrap();
        assert!(store.get_pipeline(p.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_pipeline_twice_is_duplicate() {
        let store = MemoryStore::new();
        let p = pipeline("test-pipeline");
        store.create_pipeline(&p).await.unwrap();

        let err = store.create_pipeline(&p).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let store = MemoryStore::new();
        let p = pipeline("ghost");

        assert!(store.update_pipeline(&p).await.unwrap_err().is_not_found());
        assert!(store.delete_pipeline(p.id).await.unwrap_err().is_not_found());

        let run = PipelineRun::new(p.id, "main");
        assert!(store.get_pipeline_run(run.id).await.unwrap_err().is_not_found());
        assert!(store.update_pipeline_run(&run).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_pipelines_sorted_by_name() {
        let store = MemoryStore::new();
        for name in ["charlie", "alpha", "bravo"] {
            store.create_pipeline(&pipeline(name)).await.unwrap();
        }

        let names: Vec<_> = store
            .list_pipelines()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    }

    #[tokio::test]
    async fn test_runs_are_stored_as_copies() {
        let store = MemoryStore::new();
        let mut run = PipelineRun::new(ResourceId::new(), "main");
        store.create_pipeline_run(&run).await.unwrap();

        run.set_status(RunStatus::Running);
        assert_eq!(
            store.get_pipeline_run(run.id).await.unwrap().status,
            RunStatus::Pending
        );

        store.update_pipeline_run(&run).await.unwrap();
        assert_eq!(
            store.get_pipeline_run(run.id).await.unwrap().status,
            RunStatus::Running
        );
    }

    #[tokio::test]
    async fn test_list_runs_for_pipeline() {
        let store = MemoryStore::new();
        let a = ResourceId::new();
        let b = ResourceId::new();
        let first = PipelineRun::new(a, "main");
        let other = PipelineRun::new(b, "main");
        let second = PipelineRun::new(a, "dev");
        for run in [&first, &other, &second] {
            store.create_pipeline_run(run).await.unwrap();
        }

        assert_eq!(store.list_pipeline_runs().await.unwrap().len(), 3);

        let ids: Vec<_> = store
            .list_runs_for_pipeline(a)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
    }
}
