//! Pipeline definition parsing.

use crate::kdl_util::{children, get_bool_prop, get_first_string_arg};
use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use stagerunner_core::{BuildStage, DeployStage, PipelineDefinition, RunStage, StageKind, Stages};
use std::path::Path;

/// Parse a pipeline definition from KDL text.
///
/// ```kdl
/// pipeline "my-service" { repository "github.com/org/repo" }
/// stage "run" continue-on-error=#true { command "cargo test" }
/// stage "build" { dockerfile "Dockerfile" }
/// stage "deploy" { cluster "prod"; manifest "k8s/" }
/// ```
pub fn parse_pipeline(kdl: &str) -> ConfigResult<PipelineDefinition> {
    let doc: KdlDocument = kdl.parse()?;

    let mut header: Option<(String, String)> = None;
    let mut run = None;
    let mut build = None;
    let mut deploy = None;

    for node in doc.nodes() {
        match node.name().value() {
            "pipeline" => {
                if header.is_some() {
                    return Err(ConfigError::Duplicate("pipeline".to_string()));
                }
                header = Some(parse_header(node)?);
            }
            "stage" => {
                let kind_name = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("stage kind".to_string()))?;
                let kind: StageKind = kind_name.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "stage kind".to_string(),
                    message: format!("unknown stage kind: {}", kind_name),
                })?;
                let continue_on_error = get_bool_prop(node, "continue-on-error").unwrap_or(false);

                let already_defined = match kind {
                    StageKind::Run => run
                        .replace(parse_run_stage(node).with_continue_on_error(continue_on_error))
                        .is_some(),
                    StageKind::Build => build
                        .replace(parse_build_stage(node).with_continue_on_error(continue_on_error))
                        .is_some(),
                    StageKind::Deploy => deploy
                        .replace(parse_deploy_stage(node).with_continue_on_error(continue_on_error))
                        .is_some(),
                };
                if already_defined {
                    return Err(ConfigError::Duplicate(format!("stage '{}'", kind)));
                }
            }
            _ => {} // Ignore unknown nodes
        }
    }

    let (name, repository) =
        header.ok_or_else(|| ConfigError::MissingField("pipeline name".to_string()))?;
    let missing = |kind: StageKind| ConfigError::MissingField(format!("stage '{}'", kind));

    let definition = PipelineDefinition {
        name,
        repository,
        stages: Stages::new(
            run.ok_or_else(|| missing(StageKind::Run))?,
            build.ok_or_else(|| missing(StageKind::Build))?,
            deploy.ok_or_else(|| missing(StageKind::Deploy))?,
        ),
    };

    definition.validate().map_err(|e| ConfigError::InvalidValue {
        field: "stages".to_string(),
        message: e.to_string(),
    })?;

    Ok(definition)
}

/// Read and parse a pipeline definition file.
pub fn load_pipeline(path: impl AsRef<Path>) -> ConfigResult<PipelineDefinition> {
    let text = std::fs::read_to_string(path)?;
    parse_pipeline(&text)
}

fn parse_header(node: &KdlNode) -> ConfigResult<(String, String)> {
    let name = get_first_string_arg(node)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ConfigError::MissingField("pipeline name".to_string()))?;
    let repository = child_string(node, "repository").unwrap_or_default();
    Ok((name, repository))
}

fn parse_run_stage(node: &KdlNode) -> RunStage {
    RunStage::new(child_string(node, "command").unwrap_or_default())
}

fn parse_build_stage(node: &KdlNode) -> BuildStage {
    BuildStage::new(child_string(node, "dockerfile").unwrap_or_default())
}

fn parse_deploy_stage(node: &KdlNode) -> DeployStage {
    DeployStage::new(
        child_string(node, "cluster").unwrap_or_default(),
        child_string(node, "manifest").unwrap_or_default(),
    )
}

fn child_string(node: &KdlNode, name: &str) -> Option<String> {
    children(node)
        .find(|child| child.name().value() == name)
        .and_then(get_first_string_arg)
}
