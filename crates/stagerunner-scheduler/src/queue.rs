//! Bounded admission queue with a per-pipeline quota.
//!
//! The queue caps both the total backlog and the backlog of each pipeline, so
//! one pipeline triggered over and over cannot take every slot from the
//! others. Runs leave the queue in strict FIFO order.

use parking_lot::Mutex;
use stagerunner_core::{PipelineRun, ResourceId};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error(
        "queue is full - can not enqueue more than {capacity} runs, consider using more workers"
    )]
    Full { capacity: usize },

    #[error(
        "pipeline {pipeline_id} has reached its maximum queued runs - can not enqueue more than {limit} runs per pipeline"
    )]
    PipelineQuotaExceeded { pipeline_id: ResourceId, limit: usize },

    #[error("queue is empty")]
    Empty,
}

#[derive(Default)]
struct Inner {
    runs: VecDeque<PipelineRun>,
    /// Queued runs per pipeline. Entries are removed when they reach zero.
    per_pipeline: HashMap<ResourceId, usize>,
}

pub struct AdmissionQueue {
    capacity: usize,
    per_pipeline_limit: usize,
    inner: Mutex<Inner>,
}

impl AdmissionQueue {
    pub fn new(capacity: usize, per_pipeline_limit: usize) -> Self {
        Self {
            capacity,
            per_pipeline_limit,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Append `run` to the tail of the queue.
    pub fn enqueue(&self, run: PipelineRun) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();

        if inner.runs.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }

        let queued = inner.per_pipeline.get(&run.pipeline_id).copied().unwrap_or(0);
        if queued >= self.per_pipeline_limit {
            return Err(QueueError::PipelineQuotaExceeded {
                pipeline_id: run.pipeline_id,
                limit: self.per_pipeline_limit,
            });
        }

        *inner.per_pipeline.entry(run.pipeline_id).or_insert(0) += 1;
        inner.runs.push_back(run);
        Ok(())
    }

    /// Remove and return the head of the queue.
    pub fn dequeue(&self) -> Result<PipelineRun, QueueError> {
        let mut inner = self.inner.lock();
        let run = inner.runs.pop_front().ok_or(QueueError::Empty)?;

        if let Some(count) = inner.per_pipeline.get_mut(&run.pipeline_id) {
            *count -= 1;
            if *count == 0 {
                inner.per_pipeline.remove(&run.pipeline_id);
            }
        }

        Ok(run)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().runs.is_empty()
    }

    /// Queued runs of one pipeline, `None` when it has nothing queued.
    pub fn queued_for(&self, pipeline_id: ResourceId) -> Option<usize> {
        self.inner.lock().per_pipeline.get(&pipeline_id).copied()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn per_pipeline_limit(&self) -> usize {
        self.per_pipeline_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn run_for(pipeline_id: ResourceId) -> PipelineRun {
        PipelineRun::new(pipeline_id, "main")
    }

    #[test]
    fn test_capacity_across_pipelines() {
        let queue = AdmissionQueue::new(3, 3);
        for _ in 0..3 {
            queue.enqueue(run_for(ResourceId::new())).unwrap();
        }

        let err = queue.enqueue(run_for(ResourceId::new())).unwrap_err();
        assert_eq!(err, QueueError::Full { capacity: 3 });
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_per_pipeline_quota() {
        let queue = AdmissionQueue::new(10, 2);
        let pipeline = ResourceId::new();
        queue.enqueue(run_for(pipeline)).unwrap();
        queue.enqueue(run_for(pipeline)).unwrap();

        let err = queue.enqueue(run_for(pipeline)).unwrap_err();
        assert!(matches!(err, QueueError::PipelineQuotaExceeded { pipeline_id, limit: 2 } if pipeline_id == pipeline));

        // Other pipelines are unaffected.
        queue.enqueue(run_for(ResourceId::new())).unwrap();
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_fifo_order() {
        let queue = AdmissionQueue::new(5, 5);
        let pipeline = ResourceId::new();
        let runs: Vec<_> = (0..4).map(|_| run_for(pipeline)).collect();
        for run in &runs {
            queue.enqueue(run.clone()).unwrap();
        }

        for run in &runs {
            assert_eq!(queue.dequeue().unwrap().id, run.id);
        }
        assert_eq!(queue.dequeue().unwrap_err(), QueueError::Empty);
    }

    #[test]
    fn test_count_entry_removed_when_drained() {
        let queue = AdmissionQueue::new(5, 2);
        let pipeline = ResourceId::new();
        queue.enqueue(run_for(pipeline)).unwrap();
        assert_eq!(queue.queued_for(pipeline), Some(1));

        queue.dequeue().unwrap();
        assert_eq!(queue.queued_for(pipeline), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_frees_quota() {
        let queue = AdmissionQueue::new(5, 1);
        let pipeline = ResourceId::new();
        queue.enqueue(run_for(pipeline)).unwrap();
        assert!(queue.enqueue(run_for(pipeline)).is_err());

        queue.dequeue().unwrap();
        queue.enqueue(run_for(pipeline)).unwrap();
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            QueueError::Full { capacity: 10 }.to_string(),
            "queue is full - can not enqueue more than 10 runs, consider using more workers"
        );
        assert_eq!(QueueError::Empty.to_string(), "queue is empty");
    }

    #[test]
    fn test_concurrent_enqueue_never_exceeds_limits() {
        let queue = Arc::new(AdmissionQueue::new(8, 3));
        let pipelines: Vec<_> = (0..4).map(|_| ResourceId::new()).collect();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let queue = queue.clone();
                let pipeline = pipelines[i % pipelines.len()];
                std::thread::spawn(move || queue.enqueue(run_for(pipeline)).is_ok())
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 8);
        assert_eq!(queue.len(), 8);
        for pipeline in pipelines {
            assert!(queue.queued_for(pipeline).unwrap_or(0) <= 3);
        }
    }
}
