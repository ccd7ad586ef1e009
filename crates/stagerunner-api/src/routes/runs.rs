//! Pipeline run endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use stagerunner_core::ResourceId;

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;
use crate::models::RunResponse;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_runs))
        .route("/{run_id}", get(get_run))
}

#[derive(Debug, Deserialize)]
struct ListRunsQuery {
    pipeline_id: Option<String>,
}

async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<Vec<RunResponse>>, ApiError> {
    let runs = match query.pipeline_id {
        Some(id) => {
            let id: ResourceId = id
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid pipeline_id: {}", id)))?;
            state.store.list_runs_for_pipeline(id).await?
        }
        None => state.store.list_pipeline_runs().await?,
    };
    Ok(Json(runs.into_iter().map(RunResponse::from).collect()))
}

async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state
        .store
        .get_pipeline_run(parse_id(&run_id, "pipeline run")?)
        .await?;
    Ok(Json(run.into()))
}
