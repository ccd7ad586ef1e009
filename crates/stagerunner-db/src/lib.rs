//! Storage layer for stagerunner.
//!
//! Provides the store traits consumed by the scheduler and the API, and an
//! in-memory implementation.

pub mod error;
pub mod memory;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use repo::*;
