//! Scheduler errors.

use stagerunner_db::DbError;
use thiserror::Error;

use crate::queue::QueueError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("store error: {0}")]
    Store(#[from] DbError),

    #[error("dispatcher stopped: {0}")]
    Dispatcher(String),
}

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
