//! Run commands.

use anyhow::{Context, Result};
use stagerunner_core::StageKind;

use crate::client::Client;

pub async fn list(client: &Client, pipeline: Option<String>) -> Result<()> {
    let runs = client
        .list_runs(pipeline.as_deref())
        .await
        .context("error listing runs")?;
    for r in runs {
        println!(
            "Run ID: {}, Pipeline: {}, GitRef: {}, Status: {}",
            r.id, r.pipeline_id, r.git_ref, r.status
        );
    }
    Ok(())
}

pub async fn show(client: &Client, id: &str) -> Result<()> {
    let run = client.get_run(id).await.context("error getting run")?;
    println!("{}", run);
    Ok(())
}

/// Print stage logs in execution order, or only the log of `stage`.
pub async fn logs(client: &Client, id: &str, stage: Option<StageKind>) -> Result<()> {
    let run = client.get_run(id).await.context("error getting run")?;
    let stages = match stage {
        Some(kind) => vec![kind],
        None => StageKind::ALL.to_vec(),
    };

    for kind in stages {
        let log = run.stage_log(kind);
        if log.is_empty() {
            continue;
        }
        println!("== {} ==", kind);
        print!("{}", log);
    }
    Ok(())
}
