//! Stage execution backends for stagerunner.
//!
//! Stage side effects are simulated: every stage validates its definition,
//! asks an [`OutcomeProvider`] whether it should fail, and otherwise waits a
//! fixed delay before reporting success.

pub mod outcome;
pub mod simulated;

pub use outcome::{FixedOutcome, RandomOutcome, ScriptedOutcome};
pub use simulated::SimulatedExecutor;
pub use stagerunner_core::executor::{OutcomeProvider, StageExecutor, StageOutcome};
