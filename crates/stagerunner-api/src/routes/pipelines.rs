//! Pipeline management endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use stagerunner_core::{Pipeline, PipelineDefinition};
use tracing::info;

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;
use crate::models::{
    CreatePipelineResponse, PipelineRequest, PipelineResponse, TriggerPipelineRequest,
    TriggerPipelineResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pipelines).post(create_pipeline))
        .route(
            "/{id}",
            get(get_pipeline).put(update_pipeline).delete(delete_pipeline),
        )
        .route("/{id}/trigger", post(trigger_pipeline))
}

async fn list_pipelines(
    State(state): State<AppState>,
) -> Result<Json<Vec<PipelineResponse>>, ApiError> {
    let pipelines = state.store.list_pipelines().await?;
    Ok(Json(pipelines.into_iter().map(PipelineResponse::from).collect()))
}

async fn create_pipeline(
    State(state): State<AppState>,
    payload: Result<Json<PipelineRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePipelineResponse>), ApiError> {
    let Json(req) = payload?;
    let definition = PipelineDefinition::from(req);
    definition.validate()?;

    let pipeline = Pipeline::new(definition);
    state.store.create_pipeline(&pipeline).await?;
    info!(pipeline_id = %pipeline.id, name = %pipeline.name, "Pipeline created");

    Ok((
        StatusCode::CREATED,
        Json(CreatePipelineResponse {
            id: pipeline.id.to_string(),
        }),
    ))
}

async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let pipeline = state.store.get_pipeline(parse_id(&id, "pipeline")?).await?;
    Ok(Json(pipeline.into()))
}

async fn update_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PipelineRequest>, JsonRejection>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let Json(req) = payload?;
    let mut pipeline = state.store.get_pipeline(parse_id(&id, "pipeline")?).await?;

    let definition = PipelineDefinition::from(req);
    definition.validate()?;
    pipeline.apply(definition);

    state.store.update_pipeline(&pipeline).await?;
    info!(pipeline_id = %pipeline.id, "Pipeline updated");
    Ok(Json(pipeline.into()))
}

async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "pipeline")?;
    state.store.delete_pipeline(id).await?;
    info!(pipeline_id = %id, "Pipeline deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn trigger_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TriggerPipelineRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TriggerPipelineResponse>), ApiError> {
    let Json(req) = payload?;
    if req.git_ref.trim().is_empty() {
        return Err(ApiError::BadRequest("git_ref is required".to_string()));
    }

    let pipeline = state.store.get_pipeline(parse_id(&id, "pipeline")?).await?;
    let run = state
        .orchestrator
        .trigger_pipeline(&pipeline, req.git_ref)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerPipelineResponse {
            id: run.id.to_string(),
        }),
    ))
}
