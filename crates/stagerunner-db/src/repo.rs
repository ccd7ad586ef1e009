//! Store traits.

pub mod pipeline;
pub mod run;

pub use pipeline::PipelineStore;
pub use run::PipelineRunStore;

/// Combined store for pipelines and pipeline runs.
///
/// Implementations must be safe for concurrent use by workers and API
/// handlers at the same time.
pub trait Store: PipelineStore + PipelineRunStore {}

impl<T: PipelineStore + PipelineRunStore> Store for T {}
