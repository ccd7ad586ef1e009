//! HTTP client for the stagerunner API.

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use stagerunner_api::models::{
    CreatePipelineResponse, PipelineRequest, PipelineResponse, RunResponse,
    TriggerPipelineRequest, TriggerPipelineResponse,
};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to send request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

pub struct Client {
    base: Url,
    http: reqwest::Client,
    token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, token: Option<String>) -> ClientResult<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base,
            http,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join(&format!("api/v1/{}", path.trim_start_matches('/')))?)
    }

    pub async fn list_pipelines(&self) -> ClientResult<Vec<PipelineResponse>> {
        self.json(Method::GET, "pipelines", None::<&()>).await
    }

    pub async fn get_pipeline(&self, id: &str) -> ClientResult<PipelineResponse> {
        self.json(Method::GET, &format!("pipelines/{}", id), None::<&()>)
            .await
    }

    pub async fn create_pipeline(
        &self,
        req: &PipelineRequest,
    ) -> ClientResult<CreatePipelineResponse> {
        self.json(Method::POST, "pipelines", Some(req)).await
    }

    pub async fn update_pipeline(
        &self,
        id: &str,
        req: &PipelineRequest,
    ) -> ClientResult<PipelineResponse> {
        self.json(Method::PUT, &format!("pipelines/{}", id), Some(req))
            .await
    }

    pub async fn delete_pipeline(&self, id: &str) -> ClientResult<()> {
        self.send(Method::DELETE, &format!("pipelines/{}", id), None::<&()>)
            .await?;
        Ok(())
    }

    pub async fn trigger_pipeline(
        &self,
        id: &str,
        git_ref: &str,
    ) -> ClientResult<TriggerPipelineResponse> {
        let req = TriggerPipelineRequest {
            git_ref: git_ref.to_string(),
        };
        self.json(Method::POST, &format!("pipelines/{}/trigger", id), Some(&req))
            .await
    }

    pub async fn list_runs(&self, pipeline_id: Option<&str>) -> ClientResult<Vec<RunResponse>> {
        let path = match pipeline_id {
            Some(id) => format!("runs?pipeline_id={}", id),
            None => "runs".to_string(),
        };
        self.json(Method::GET, &path, None::<&()>).await
    }

    pub async fn get_run(&self, id: &str) -> ClientResult<RunResponse> {
        self.json(Method::GET, &format!("runs/{}", id), None::<&()>)
            .await
    }

    async fn json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self.send(method, path, body).await?.json().await?)
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "Sending request");

        let mut request: RequestBuilder = self.http.request(method, url);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_under_api_v1() {
        let client = Client::new("http://localhost:8080", None).unwrap();
        assert_eq!(
            client.endpoint("pipelines").unwrap().as_str(),
            "http://localhost:8080/api/v1/pipelines"
        );
        assert_eq!(
            client.endpoint("/runs?pipeline_id=abc").unwrap().as_str(),
            "http://localhost:8080/api/v1/runs?pipeline_id=abc"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = Client::new("https://ci.example.com/stagerunner", None).unwrap();
        assert_eq!(
            client.endpoint("runs").unwrap().as_str(),
            "https://ci.example.com/stagerunner/api/v1/runs"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            Client::new("not a url", None),
            Err(ClientError::Url(_))
        ));
    }

    #[test]
    fn test_empty_token_is_dropped() {
        let client = Client::new("http://localhost:8080", Some(String::new())).unwrap();
        assert!(client.token.is_none());
    }
}
