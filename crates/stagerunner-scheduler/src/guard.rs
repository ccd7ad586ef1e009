//! Per-pipeline mutual exclusion.
//!
//! A worker holds a [`PipelineSlot`] for the whole time its run is
//! executing. The slot is released when dropped, so a worker that returns
//! early on any path frees the pipeline for the next run.

use parking_lot::Mutex;
use stagerunner_core::ResourceId;
use std::collections::HashMap;
use std::sync::Arc;

/// Pipelines that currently have a run executing, mapped to that run.
#[derive(Clone, Default)]
pub struct ActivePipelines {
    inner: Arc<Mutex<HashMap<ResourceId, ResourceId>>>,
}

impl ActivePipelines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `pipeline_id` for `run_id`.
    ///
    /// Returns the ID of the run holding the pipeline when it is taken by a
    /// different run.
    pub fn try_acquire(
        &self,
        pipeline_id: ResourceId,
        run_id: ResourceId,
    ) -> Result<PipelineSlot, ResourceId> {
        let mut active = self.inner.lock();
        match active.get(&pipeline_id) {
            Some(holder) if *holder != run_id => Err(*holder),
            _ => {
                active.insert(pipeline_id, run_id);
                Ok(PipelineSlot {
                    active: self.clone(),
                    pipeline_id,
                    run_id,
                })
            }
        }
    }

    /// Run currently holding `pipeline_id`, if any.
    pub fn holder(&self, pipeline_id: ResourceId) -> Option<ResourceId> {
        self.inner.lock().get(&pipeline_id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn release(&self, pipeline_id: ResourceId, run_id: ResourceId) {
        let mut active = self.inner.lock();
        if active.get(&pipeline_id) == Some(&run_id) {
            active.remove(&pipeline_id);
        }
    }
}

/// Exclusive claim on a pipeline, released on drop.
pub struct PipelineSlot {
    active: ActivePipelines,
    pipeline_id: ResourceId,
    run_id: ResourceId,
}

impl PipelineSlot {
    pub fn pipeline_id(&self) -> ResourceId {
        self.pipeline_id
    }

    pub fn run_id(&self) -> ResourceId {
        self.run_id
    }
}

impl Drop for PipelineSlot {
    fn drop(&mut self) {
        self.active.release(self.pipeline_id, self.run_id);
    }
}
