//! KDL configuration parsing for stagerunner.
//!
//! This crate handles parsing of:
//! - Pipeline definition files (`pipeline.kdl`)
//! - Server and scheduler configuration

pub mod error;
mod kdl_util;
pub mod pipeline;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use pipeline::{load_pipeline, parse_pipeline};
pub use system::{SchedulerConfig, ServerConfig, load_system_config, parse_system_config};
