//! Pipeline commands.

use anyhow::{Context, Result, bail};
use stagerunner_api::models::PipelineRequest;
use std::path::PathBuf;

use crate::client::Client;

/// Where a pipeline definition comes from: a JSON argument or a KDL file.
pub struct DefinitionSource {
    pub json: Option<String>,
    pub file: Option<PathBuf>,
}

impl DefinitionSource {
    pub fn load(self) -> Result<PipelineRequest> {
        match (self.json, self.file) {
            (Some(_), Some(_)) => bail!("pass either a JSON definition or --file, not both"),
            (Some(json), None) => {
                serde_json::from_str(&json).context("error parsing pipeline JSON definition")
            }
            (None, Some(path)) => {
                let definition = stagerunner_config::load_pipeline(&path)
                    .with_context(|| format!("error loading {}", path.display()))?;
                Ok(PipelineRequest::from(&definition))
            }
            (None, None) => bail!("pipeline definition required (JSON argument or --file)"),
        }
    }
}

pub async fn list(client: &Client) -> Result<()> {
    let pipelines = client
        .list_pipelines()
        .await
        .context("error listing pipelines")?;
    for p in pipelines {
        println!("ID: {}, Name: {}, Repository: {}", p.id, p.name, p.repository);
    }
    Ok(())
}

pub async fn get(client: &Client, id: &str) -> Result<()> {
    let pipeline = client
        .get_pipeline(id)
        .await
        .context("error getting pipeline")?;
    println!("{}", pipeline);
    Ok(())
}

pub async fn create(client: &Client, source: DefinitionSource) -> Result<()> {
    let req = source.load()?;
    let resp = client
        .create_pipeline(&req)
        .await
        .context("error creating pipeline")?;
    println!("Pipeline created. ID: {}", resp.id);
    Ok(())
}

pub async fn update(client: &Client, id: &str, source: DefinitionSource) -> Result<()> {
    let req = source.load()?;
    let pipeline = client
        .update_pipeline(id, &req)
        .await
        .context("error updating pipeline")?;
    println!("Pipeline updated.\n{}", pipeline);
    Ok(())
}

pub async fn delete(client: &Client, id: &str) -> Result<()> {
    client
        .delete_pipeline(id)
        .await
        .context("error deleting pipeline")?;
    println!("Pipeline {} deleted.", id);
    Ok(())
}

pub async fn trigger(client: &Client, id: &str, git_ref: &str) -> Result<()> {
    let resp = client
        .trigger_pipeline(id, git_ref)
        .await
        .context("error triggering pipeline")?;
    println!("Pipeline triggered. Run ID: {}", resp.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_definition() {
        let source = DefinitionSource {
            json: Some(
                r#"{"name": "svc", "repository": "github.com/org/svc",
                    "stages": {"run_stage": {"command": "make test"}}}"#
                    .to_string(),
            ),
            file: None,
        };
        let req = source.load().unwrap();
        assert_eq!(req.name, "svc");
        assert_eq!(req.stages.run_stage.command, "make test");
        assert!(req.stages.build_stage.dockerfile_path.is_empty());
    }

    #[test]
    fn test_definition_source_required() {
        let source = DefinitionSource {
            json: None,
            file: None,
        };
        assert!(source.load().is_err());

        let source = DefinitionSource {
            json: Some("{}".to_string()),
            file: Some(PathBuf::from("pipeline.kdl")),
        };
        assert!(source.load().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let source = DefinitionSource {
            json: Some("{not json".to_string()),
            file: None,
        };
        assert!(source.load().is_err());
    }
}
