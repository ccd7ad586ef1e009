//! Server and scheduler configuration.
//!
//! Values come from three layers: built-in defaults, an optional KDL file and
//! command-line flags. This module owns the first two; the server binary
//! overlays its flags on the result.

use kdl::{KdlDocument, KdlNode};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::kdl_util::{children, require_f64, require_string, require_u64, require_usize};
use crate::{ConfigError, ConfigResult};

/// Tunables of the admission queue, dispatcher and simulated stages.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Global cap on queued runs.
    pub queue_size: usize,
    /// Cap on queued runs of any single pipeline.
    pub max_queued_per_pipeline: usize,
    /// Retry interval for an empty queue and for a busy pipeline.
    pub poll_interval: Duration,
    /// Simulated latency of every stage.
    pub stage_delay: Duration,
    /// Probability in `[0, 1]` that a simulated stage fails.
    pub failure_rate: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_size: 10,
            max_queued_per_pipeline: 3,
            poll_interval: Duration::from_secs(1),
            stage_delay: Duration::from_secs(5),
            failure_rate: 0.0,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers", "must be at least 1"));
        }
        if self.queue_size == 0 {
            return Err(ConfigError::invalid("queue-size", "must be at least 1"));
        }
        if self.max_queued_per_pipeline == 0 {
            return Err(ConfigError::invalid("per-pipeline-queue", "must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::invalid("poll-interval-ms", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ConfigError::invalid(
                "failure-rate",
                format!("{} is not within [0, 1]", self.failure_rate),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Listen address of the HTTP API.
    pub addr: String,
    pub scheduler: SchedulerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.addr
            .parse()
            .map_err(|e| ConfigError::invalid("addr", format!("{}: {}", self.addr, e)))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.socket_addr()?;
        self.scheduler.validate()
    }
}

/// Parse server configuration from KDL text.
///
/// ```kdl
/// server { addr "0.0.0.0:8080" }
/// scheduler { workers 2; queue-size 10; per-pipeline-queue 3; poll-interval-ms 1000 }
/// stages { delay-ms 5000; failure-rate 0.0 }
/// ```
///
/// Absent values keep their defaults and unknown nodes are ignored. The result
/// is not validated, so callers can overlay further settings first.
pub fn parse_system_config(kdl: &str) -> ConfigResult<ServerConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = ServerConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "server" => parse_server(node, &mut config)?,
            "scheduler" => parse_scheduler(node, &mut config.scheduler)?,
            "stages" => parse_stages(node, &mut config.scheduler)?,
            _ => {}
        }
    }

    Ok(config)
}

/// Read and parse a configuration file.
pub fn load_system_config(path: impl AsRef<Path>) -> ConfigResult<ServerConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_system_config(&text)
}

fn parse_server(node: &KdlNode, config: &mut ServerConfig) -> ConfigResult<()> {
    for child in children(node) {
        if child.name().value() == "addr" {
            config.addr = require_string(child, "addr")?;
        }
    }
    Ok(())
}

fn parse_scheduler(node: &KdlNode, config: &mut SchedulerConfig) -> ConfigResult<()> {
    for child in children(node) {
        match child.name().value() {
            "workers" => config.workers = require_usize(child, "workers")?,
            "queue-size" => config.queue_size = require_usize(child, "queue-size")?,
            "per-pipeline-queue" => {
                config.max_queued_per_pipeline = require_usize(child, "per-pipeline-queue")?
            }
            "poll-interval-ms" => {
                config.poll_interval =
                    Duration::from_millis(require_u64(child, "poll-interval-ms")?)
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_stages(node: &KdlNode, config: &mut SchedulerConfig) -> ConfigResult<()> {
    for child in children(node) {
        match child.name().value() {
            "delay-ms" => {
                config.stage_delay = Duration::from_millis(require_u64(child, "delay-ms")?)
            }
            "failure-rate" => config.failure_rate = require_f64(child, "failure-rate")?,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.workers, 2);
        assert_eq!(config.scheduler.queue_size, 10);
        assert_eq!(config.scheduler.max_queued_per_pipeline, 3);
        assert_eq!(config.scheduler.stage_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_full_config() {
        let kdl = r#"
            server {
                addr "127.0.0.1:9000"
            }
            scheduler {
                workers 4
                queue-size 50
                per-pipeline-queue 5
                poll-interval-ms 250
            }
            stages {
                delay-ms 10
                failure-rate 0.25
            }
        "#;

        let config = parse_system_config(kdl).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.scheduler.workers, 4);
        assert_eq!(config.scheduler.queue_size, 50);
        assert_eq!(config.scheduler.max_queued_per_pipeline, 5);
        assert_eq!(config.scheduler.poll_interval, Duration::from_millis(250));
        assert_eq!(config.scheduler.stage_delay, Duration::from_millis(10));
        assert_eq!(config.scheduler.failure_rate, 0.25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_system_config("scheduler { workers 8; }\nunknown 1").unwrap();
        assert_eq!(config.scheduler.workers, 8);
        assert_eq!(config.scheduler.queue_size, 10);
        assert_eq!(config.addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_integer_failure_rate() {
        let config = parse_system_config("stages { failure-rate 1; }").unwrap();
        assert_eq!(config.scheduler.failure_rate, 1.0);
    }

    #[test]
    fn test_wrong_value_type() {
        let err = parse_system_config(r#"scheduler { workers "two"; }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "workers"));

        let err = parse_system_config("scheduler { queue-size -1; }").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SchedulerConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = SchedulerConfig::default();
        config.failure_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = SchedulerConfig::default();
        config.failure_rate = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.addr = "not an address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_kdl() {
        assert!(matches!(
            parse_system_config("scheduler {").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
