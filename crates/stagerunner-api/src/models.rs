//! Request and response bodies.
//!
//! Stage objects default every missing field, so an incomplete pipeline
//! definition is reported by stage validation rather than as a decode error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagerunner_core::{
    BuildStage, DeployStage, Pipeline, PipelineDefinition, PipelineRun, RunStage, RunStatus,
    StageKind, Stages,
};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStageBody {
    pub command: String,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildStageBody {
    pub dockerfile_path: String,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployStageBody {
    pub cluster_name: String,
    pub manifest_path: String,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesBody {
    pub run_stage: RunStageBody,
    pub build_stage: BuildStageBody,
    pub deploy_stage: DeployStageBody,
}

impl From<&Stages> for StagesBody {
    fn from(stages: &Stages) -> Self {
        Self {
            run_stage: RunStageBody {
                command: stages.run.command.clone(),
                continue_on_error: stages.run.continue_on_error,
            },
            build_stage: BuildStageBody {
                dockerfile_path: stages.build.dockerfile_path.clone(),
                continue_on_error: stages.build.continue_on_error,
            },
            deploy_stage: DeployStageBody {
                cluster_name: stages.deploy.cluster_name.clone(),
                manifest_path: stages.deploy.manifest_path.clone(),
                continue_on_error: stages.deploy.continue_on_error,
            },
        }
    }
}

impl From<StagesBody> for Stages {
    fn from(body: StagesBody) -> Self {
        Stages::new(
            RunStage::new(body.run_stage.command)
                .with_continue_on_error(body.run_stage.continue_on_error),
            BuildStage::new(body.build_stage.dockerfile_path)
                .with_continue_on_error(body.build_stage.continue_on_error),
            DeployStage::new(body.deploy_stage.cluster_name, body.deploy_stage.manifest_path)
                .with_continue_on_error(body.deploy_stage.continue_on_error),
        )
    }
}

/// Body of pipeline create and update requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineRequest {
    pub name: String,
    pub repository: String,
    pub stages: StagesBody,
}

impl From<PipelineRequest> for PipelineDefinition {
    fn from(req: PipelineRequest) -> Self {
        PipelineDefinition {
            name: req.name,
            repository: req.repository,
            stages: req.stages.into(),
        }
    }
}

impl From<&PipelineDefinition> for PipelineRequest {
    fn from(def: &PipelineDefinition) -> Self {
        Self {
            name: def.name.clone(),
            repository: def.repository.clone(),
            stages: (&def.stages).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub id: String,
    pub name: String,
    pub repository: String,
    pub run_stage: RunStageBody,
    pub build_stage: BuildStageBody,
    pub deploy_stage: DeployStageBody,
}

impl From<Pipeline> for PipelineResponse {
    fn from(pipeline: Pipeline) -> Self {
        let stages = StagesBody::from(&pipeline.stages);
        Self {
            id: pipeline.id.to_string(),
            name: pipeline.name,
            repository: pipeline.repository,
            run_stage: stages.run_stage,
            build_stage: stages.build_stage,
            deploy_stage: stages.deploy_stage,
        }
    }
}

impl fmt::Display for PipelineResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "  Name: {}", self.name)?;
        writeln!(f, "  Repository: {}", self.repository)?;
        writeln!(
            f,
            "  Run: command={:?} continue_on_error={}",
            self.run_stage.command, self.run_stage.continue_on_error
        )?;
        writeln!(
            f,
            "  Build: dockerfile_path={:?} continue_on_error={}",
            self.build_stage.dockerfile_path, self.build_stage.continue_on_error
        )?;
        write!(
            f,
            "  Deploy: cluster_name={:?} manifest_path={:?} continue_on_error={}",
            self.deploy_stage.cluster_name,
            self.deploy_stage.manifest_path,
            self.deploy_stage.continue_on_error
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePipelineResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPipelineRequest {
    pub git_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPipelineResponse {
    pub id: String,
}

/// A pipeline run with its stage logs rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    pub id: String,
    pub pipeline_id: String,
    pub git_ref: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub run_status: RunStatus,
    pub build_status: RunStatus,
    pub deploy_status: RunStatus,
    /// Stage name to newline-separated log lines.
    pub logs: BTreeMap<String, String>,
}

impl From<PipelineRun> for RunResponse {
    fn from(run: PipelineRun) -> Self {
        let logs = run
            .logs
            .keys()
            .map(|kind| (kind.to_string(), run.render_logs(*kind)))
            .collect();
        Self {
            id: run.id.to_string(),
            pipeline_id: run.pipeline_id.to_string(),
            git_ref: run.git_ref,
            status: run.status,
            created_at: run.created_at,
            updated_at: run.updated_at,
            run_status: run.run_status,
            build_status: run.build_status,
            deploy_status: run.deploy_status,
            logs,
        }
    }
}

impl RunResponse {
    /// Log text of one stage, empty when the stage has not logged anything.
    pub fn stage_log(&self, kind: StageKind) -> &str {
        self.logs.get(kind.as_str()).map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for RunResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "  PipelineID: {}", self.pipeline_id)?;
        writeln!(f, "  GitRef: {}", self.git_ref)?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  CreatedAt: {}", self.created_at.to_rfc3339())?;
        writeln!(f, "  UpdatedAt: {}", self.updated_at.to_rfc3339())?;
        writeln!(f, "  RunStatus: {}", self.run_status)?;
        writeln!(f, "  BuildStatus: {}", self.build_status)?;
        write!(f, "  DeployStatus: {}", self.deploy_status)
    }
}
