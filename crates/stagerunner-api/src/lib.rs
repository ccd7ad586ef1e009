//! HTTP API for stagerunner.
//!
//! Pipeline management and run triggering on top of the store and the run
//! orchestrator.

pub mod auth;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

pub use state::AppState;
