//! Stage definitions.
//!
//! Every pipeline has exactly three stages which always execute in the same
//! order: run, build, deploy. Each kind carries its own parameters and a
//! `continue_on_error` flag that decides whether a failure aborts the run.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The closed set of stage kinds, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    #[display("run")]
    Run,
    #[display("build")]
    Build,
    #[display("deploy")]
    Deploy,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Run, StageKind::Build, StageKind::Deploy];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Run => "run",
            StageKind::Build => "build",
            StageKind::Deploy => "deploy",
        }
    }

    /// Whether this is the final stage of a run.
    pub fn is_last(&self) -> bool {
        matches!(self, StageKind::Deploy)
    }
}

impl std::str::FromStr for StageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "run" => Ok(StageKind::Run),
            "build" => Ok(StageKind::Build),
            "deploy" => Ok(StageKind::Deploy),
            other => Err(Error::InvalidInput(format!("unknown stage kind: {}", other))),
        }
    }
}

/// Runs an arbitrary command (lint, test).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStage {
    pub command: String,
    #[serde(default)]
    pub continue_on_error: bool,
}

impl RunStage {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            continue_on_error: false,
        }
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Builds a container image from a Dockerfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStage {
    pub dockerfile_path: String,
    #[serde(default)]
    pub continue_on_error: bool,
}

impl BuildStage {
    pub fn new(dockerfile_path: impl Into<String>) -> Self {
        Self {
            dockerfile_path: dockerfile_path.into(),
            continue_on_error: false,
        }
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Deploys a manifest to a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployStage {
    pub cluster_name: String,
    pub manifest_path: String,
    #[serde(default)]
    pub continue_on_error: bool,
}

impl DeployStage {
    pub fn new(cluster_name: impl Into<String>, manifest_path: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            manifest_path: manifest_path.into(),
            continue_on_error: false,
        }
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// A single stage of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, From)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stage {
    Run(RunStage),
    Build(BuildStage),
    Deploy(DeployStage),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Run(_) => StageKind::Run,
            Stage::Build(_) => StageKind::Build,
            Stage::Deploy(_) => StageKind::Deploy,
        }
    }

    /// Check that the fields required by this stage kind are present.
    pub fn validate(&self) -> Result<()> {
        match self {
            Stage::Run(s) if s.command.is_empty() => Err(Error::Validation(
                "command is required for run stage".to_string(),
            )),
            Stage::Build(s) if s.dockerfile_path.is_empty() => Err(Error::Validation(
                "dockerfile path is required for build stage".to_string(),
            )),
            Stage::Deploy(s) if s.cluster_name.is_empty() => Err(Error::Validation(
                "cluster name is required for deploy stage".to_string(),
            )),
            Stage::Deploy(s) if s.manifest_path.is_empty() => Err(Error::Validation(
                "manifest path is required for deploy stage".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn continue_on_error(&self) -> bool {
        match self {
            Stage::Run(s) => s.continue_on_error,
            Stage::Build(s) => s.continue_on_error,
            Stage::Deploy(s) => s.continue_on_error,
        }
    }

    /// Human-readable line describing the stage parameters.
    pub fn describe(&self) -> String {
        match self {
            Stage::Run(s) => format!("command: {}", s.command),
            Stage::Build(s) => format!("dockerfile path: {}", s.dockerfile_path),
            Stage::Deploy(s) => format!("deploying to cluster name: {}", s.cluster_name),
        }
    }
}

/// The full stage set of a pipeline: one stage of each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stages {
    pub run: RunStage,
    pub build: BuildStage,
    pub deploy: DeployStage,
}

impl Stages {
    pub fn new(run: RunStage, build: BuildStage, deploy: DeployStage) -> Self {
        Self { run, build, deploy }
    }

    pub fn get(&self, kind: StageKind) -> Stage {
        match kind {
            StageKind::Run => Stage::Run(self.run.clone()),
            StageKind::Build => Stage::Build(self.build.clone()),
            StageKind::Deploy => Stage::Deploy(self.deploy.clone()),
        }
    }

    /// Stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        StageKind::ALL.into_iter().map(|kind| self.get(kind))
    }

    /// Validate every stage, returning the first failure.
    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|stage| stage.validate())
    }
}
