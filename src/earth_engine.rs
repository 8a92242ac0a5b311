//! Earth Engine REST access.
//!
//! [`Platform`] is the seam between the pull pipeline and the hosted service:
//! catalog listing, export submission and operation lookup. The pipeline is
//! generic over it, and [`EarthEngineClient`] is the `reqwest` implementation.

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::catalog::{ImageQuery, ListImagesResponse};
use crate::error::{PullError, Result};
use crate::export::ExportTask;
use crate::types::TaskState;

/// Default REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://earthengine.googleapis.com/v1";

/// Project hosting the public data catalog
pub const PUBLIC_CATALOG_PROJECT: &str = "earthengine-public";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Long-running operation returned by an export submission
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// `projects/<project>/operations/<id>`
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub metadata: OperationMetadata,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Finished without error and in the succeeded state
    pub fn succeeded(&self) -> bool {
        self.done && self.error.is_none() && self.metadata.state == TaskState::Succeeded
    }

    /// Error message of a failed operation
    pub fn failure(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.message.clone());
        }
        match self.metadata.state {
            TaskState::Failed | TaskState::Cancelled => {
                Some(format!("task ended in state {}", self.metadata.state))
            }
            _ => None,
        }
    }

    /// No further state changes expected
    pub fn is_finished(&self) -> bool {
        self.done || self.metadata.state.is_terminal()
    }
}

/// Hosted-platform operations the pull needs
#[allow(async_fn_in_trait)]
pub trait Platform {
    /// One page of images of the query's collection
    async fn list_images(
        &self,
        query: &ImageQuery,
        page_token: Option<&str>,
    ) -> Result<ListImagesResponse>;

    /// Submit an export task
    async fn submit<T: ExportTask>(&self, task: &T) -> Result<Operation>;

    /// Current status of a submitted operation
    async fn operation(&self, name: &str) -> Result<Operation>;
}

/// `reqwest` client for the Earth Engine REST API
#[derive(Debug, Clone)]
pub struct EarthEngineClient {
    http: reqwest::Client,
    base_url: String,
    project: String,
    access_token: String,
}

impl EarthEngineClient {
    /// Create a client for `project`, authenticating with an OAuth2 access token
    pub fn new(project: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(PullError::config("an Earth Engine access token is required"));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            project: project.into(),
            access_token,
        })
    }

    /// Point the client at another endpoint (staging, a local proxy)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// URL of the listing method for a public catalog asset
    pub fn list_images_url(&self, asset_id: &str) -> String {
        format!(
            "{}/projects/{}/assets/{}:listImages",
            self.base_url, PUBLIC_CATALOG_PROJECT, asset_id
        )
    }

    /// URL of a project-scoped method such as `image:export`
    pub fn project_url(&self, method: &str) -> String {
        format!("{}/projects/{}/{}", self.base_url, self.project, method)
    }
}

impl Platform for EarthEngineClient {
    async fn list_images(
        &self,
        query: &ImageQuery,
        page_token: Option<&str>,
    ) -> Result<ListImagesResponse> {
        let url = self.list_images_url(query.catalog.asset_id());
        let mut params = query.to_params();
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        debug!("GET {} params={:?}", url, params);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn submit<T: ExportTask>(&self, task: &T) -> Result<Operation> {
        let url = self.project_url(task.endpoint());
        debug!("POST {} description={}", url, task.description());

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&task.to_request_body())
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn operation(&self, name: &str) -> Result<Operation> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-success response into `PullError::Api`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PullError::api(status.as_u16(), error_message(status, &body)))
}

/// Message of a Google API error envelope, or the raw body
pub fn error_message(status: StatusCode, body: &str) -> String {
    let envelope: Option<Map<String, Value>> = serde_json::from_str(body).ok();
    envelope
        .as_ref()
        .and_then(|e| e.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.to_string()
            }
        })
}
