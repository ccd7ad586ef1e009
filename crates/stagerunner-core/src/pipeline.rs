//! Pipeline and pipeline run records.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stage::{StageKind, Stages};
use crate::{ResourceId, Result};

/// Everything needed to define a pipeline, minus its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Display name.
    pub name: String,
    /// Source repository reference.
    pub repository: String,
    pub stages: Stages,
}

impl PipelineDefinition {
    pub fn validate(&self) -> Result<()> {
        self.stages.validate()
    }
}

/// A stored pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique identifier, assigned at creation and never reused.
    pub id: ResourceId,
    pub name: String,
    pub repository: String,
    pub stages: Stages,
}

impl Pipeline {
    pub fn new(definition: PipelineDefinition) -> Self {
        Self {
            id: ResourceId::new(),
            name: definition.name,
            repository: definition.repository,
            stages: definition.stages,
        }
    }

    /// Replace the whole definition, keeping the identity.
    pub fn apply(&mut self, definition: PipelineDefinition) {
        self.name = definition.name;
        self.repository = definition.repository;
        self.stages = definition.stages;
    }

    pub fn definition(&self) -> PipelineDefinition {
        PipelineDefinition {
            name: self.name.clone(),
            repository: self.repository.clone(),
            stages: self.stages.clone(),
        }
    }
}

/// Status of a run or of one of its stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[display("pending")]
    Pending,
    #[display("running")]
    Running,
    #[display("success")]
    Success,
    #[display("failed")]
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

/// One timestamped line of a stage log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub status: RunStatus,
    pub message: String,
}

impl LogEntry {
    pub fn render(&self) -> String {
        format!(
            "{} [{}] {}",
            self.timestamp.to_rfc3339(),
            self.status,
            self.message
        )
    }
}

/// One execution attempt of a pipeline against a git reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: ResourceId,
    pub pipeline_id: ResourceId,
    /// Git reference (branch, tag or sha) the run was triggered for.
    pub git_ref: String,
    pub status: RunStatus,
    pub run_status: RunStatus,
    pub build_status: RunStatus,
    pub deploy_status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered log entries per stage.
    pub logs: BTreeMap<StageKind, Vec<LogEntry>>,
}

impl PipelineRun {
    pub fn new(pipeline_id: ResourceId, git_ref: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ResourceId::new(),
            pipeline_id,
            git_ref: git_ref.into(),
            status: RunStatus::Pending,
            run_status: RunStatus::Pending,
            build_status: RunStatus::Pending,
            deploy_status: RunStatus::Pending,
            created_at: now,
            updated_at: now,
            logs: BTreeMap::new(),
        }
    }

    /// Move the overall status. Terminal statuses are never left; returns
    /// whether the status changed.
    pub fn set_status(&mut self, status: RunStatus) -> bool {
        transition(&mut self.status, status)
    }

    pub fn stage_status(&self, kind: StageKind) -> RunStatus {
        match kind {
            StageKind::Run => self.run_status,
            StageKind::Build => self.build_status,
            StageKind::Deploy => self.deploy_status,
        }
    }

    /// Move the status of one stage, with the same terminal rule as
    /// [`PipelineRun::set_status`].
    pub fn set_stage_status(&mut self, kind: StageKind, status: RunStatus) -> bool {
        let slot = match kind {
            StageKind::Run => &mut self.run_status,
            StageKind::Build => &mut self.build_status,
            StageKind::Deploy => &mut self.deploy_status,
        };
        transition(slot, status)
    }

    /// Append a line to a stage log and mirror it to the operator log.
    pub fn log(&mut self, stage: StageKind, status: RunStatus, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(
            pipeline_id = %self.pipeline_id,
            run_id = %self.id,
            stage = %stage,
            status = %status,
            "{}",
            message
        );
        self.logs.entry(stage).or_default().push(LogEntry {
            timestamp: Utc::now(),
            status,
            message,
        });
    }

    pub fn stage_logs(&self, stage: StageKind) -> &[LogEntry] {
        self.logs.get(&stage).map(Vec::as_slice).unwrap_or_default()
    }

    /// Render the log of one stage as newline-terminated text.
    pub fn render_logs(&self, stage: StageKind) -> String {
        self.stage_logs(stage)
            .iter()
            .map(|entry| entry.render() + "\n")
            .collect()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn transition(slot: &mut RunStatus, to: RunStatus) -> bool {
    if slot.is_terminal() || *slot == to {
        return false;
    }
    *slot = to;
    true
}
