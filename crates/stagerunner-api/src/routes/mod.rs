//! API routes.

pub mod health;
pub mod pipelines;
pub mod runs;

use crate::AppState;
use crate::auth::require_authorization;
use crate::error::ApiError;
use axum::Router;
use axum::middleware;
use stagerunner_core::ResourceId;

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .merge(health::router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/pipelines", pipelines::router())
        .nest("/runs", runs::router())
        .layer(middleware::from_fn(require_authorization))
}

/// Parse an ID from a path segment. IDs that cannot exist are reported as
/// missing resources.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<ResourceId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("{} {} not found", what, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use stagerunner_config::SchedulerConfig;
    use stagerunner_db::{MemoryStore, PipelineStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = SchedulerConfig {
            workers: 2,
            queue_size: 5,
            max_queued_per_pipeline: 2,
            poll_interval: Duration::from_millis(5),
            stage_delay: Duration::from_millis(10),
            failure_rate: 0.0,
        };
        (router(AppState::from_config(store.clone(), &config)), store)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", "test-token")
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn pipeline_body(name: &str) -> Value {
        json!({
            "name": name,
            "repository": "github.com/test/repo",
            "stages": {
                "run_stage": { "command": "go test ./...", "continue_on_error": false },
                "build_stage": { "dockerfile_path": "Dockerfile" },
                "deploy_stage": { "cluster_name": "prod", "manifest_path": "k8s/" }
            }
        })
    }

    async fn create(app: &Router, name: &str) -> String {
        let (status, body) = send(app, "POST", "/api/v1/pipelines", Some(pipeline_body(name))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/pipelines")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_pipeline_lifecycle() {
        let (app, store) = app();
        let id = create(&app, "test-pipeline").await;

        let (status, body) = send(&app, "GET", "/api/v1/pipelines", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], id.as_str());
        assert_eq!(body[0]["repository"], "github.com/test/repo");

        let mut updated = pipeline_body("test-pipeline-updated");
        updated["stages"]["run_stage"]["command"] = json!("go test -v ./...");
        let (status, body) = send(&app, "PUT", &format!("/api/v1/pipelines/{}", id), Some(updated)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "test-pipeline-updated");
        let stored = store.get_pipeline(id.parse().unwrap()).await.unwrap();
        assert_eq!(stored.stages.run.command, "go test -v ./...");

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/pipelines/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/v1/pipelines/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_definitions_are_rejected() {
        let (app, _) = app();

        let (status, body) = send(&app, "POST", "/api/v1/pipelines", Some(json!({ "name": "test-pipeline" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "command is required for run stage");

        let (status, _) = send(&app, "POST", "/api/v1/pipelines", Some(json!("not an object"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (app, _) = app();
        let (status, _) = send(&app, "GET", "/api/v1/pipelines/456", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/pipelines/{}/trigger", ResourceId::new()),
            Some(json!({ "git_ref": "main" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/api/v1/runs/456", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_trigger_and_inspect_run() {
        let (app, _) = app();
        let id = create(&app, "test-pipeline").await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/pipelines/{}/trigger", id),
            Some(json!({ "git_ref": "test-ref" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let run_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", &format!("/api/v1/runs/{}", run_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], run_id.as_str());
        assert_eq!(body["pipeline_id"], id.as_str());
        assert_eq!(body["git_ref"], "test-ref");
        assert_eq!(body["status"], "pending");

        let (status, body) = send(&app, "GET", &format!("/api/v1/runs?pipeline_id={}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(&app, "GET", &format!("/api/v1/runs?pipeline_id={}", ResourceId::new()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_over_quota_is_too_many_requests() {
        let (app, _) = app();
        let id = create(&app, "busy-pipeline").await;
        let uri = format!("/api/v1/pipelines/{}/trigger", id);

        for _ in 0..2 {
            let (status, _) = send(&app, "POST", &uri, Some(json!({ "git_ref": "main" }))).await;
            assert_eq!(status, StatusCode::ACCEPTED);
        }
        let (status, body) = send(&app, "POST", &uri, Some(json!({ "git_ref": "main" }))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].as_str().unwrap().contains("maximum queued runs"));

        let (status, body) = send(&app, "GET", "/api/v1/runs", None).await;
        assert_eq!(status, StatusCode::OK);
        let failed = body
            .as_array()
            .unwrap()
            .iter()
            .filter(|run| run["status"] == "failed")
            .count();
        assert_eq!(failed, 1);
    }

    #[tokio::test]
    async fn test_trigger_requires_git_ref() {
        let (app, _) = app();
        let id = create(&app, "test-pipeline").await;
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/pipelines/{}/trigger", id),
            Some(json!({ "git_ref": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
