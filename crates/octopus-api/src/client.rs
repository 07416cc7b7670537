//! Octopus Deploy HTTP client
//!
//! Implements [`DeploymentService`] over the Octopus REST API using
//! `reqwest`. Requests are authenticated with the `X-Octopus-ApiKey`
//! header and bounded by an explicit, configurable timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::model::{
    find_by_name, CreateReleaseRequest, Deployment, DeploymentBody, DeploymentRequest,
    Environment, ErrorResponse, Project, Release, Task,
};
use crate::service::DeploymentService;
use crate::Result;

const API_KEY_HEADER: &str = "X-Octopus-ApiKey";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Connection settings for the Octopus server
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://octopus.example.com`
    pub host: String,
    /// API key used for every request
    pub api_key: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: std::env::var("OCTOPUS_HOST").unwrap_or_default(),
            api_key: std::env::var("OCTOPUS_API_KEY").unwrap_or_default(),
            timeout_secs: std::env::var("OCTOPUS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific server
    pub fn new(host: &str, api_key: &str) -> Self {
        ServerConfig {
            host: host.trim().to_string(),
            api_key: api_key.trim().to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Octopus REST client
pub struct OctopusClient {
    base: Url,
    http_client: reqwest::Client,
}

impl OctopusClient {
    /// Create a new client. Fails on an unparseable host or API key.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        if config.host.is_empty() {
            return Err(ApiError::InvalidConfig("Octopus host is not set".to_string()));
        }
        let base = Url::parse(&config.host)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid host '{}': {e}", config.host)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidConfig(format!(
                "host '{}' cannot be used as a base URL",
                config.host
            )));
        }

        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| ApiError::InvalidConfig("API key is not a valid header value".to_string()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("octorelease/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(OctopusClient { base, http_client })
    }

    /// Build `<host>/api/<segments...>`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidConfig(format!("host '{}' has no path", self.base)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.http_client.get(url).send().await?;
        decode(response).await
    }

    async fn get_optional<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.http_client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        let response = self.http_client.post(url).json(body).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.describe())
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body.clone()
                }
            });
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl DeploymentService for OctopusClient {
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let projects: Vec<Project> = self.get_json(&["projects", "all"]).await?;
        Ok(find_by_name(&projects, name))
    }

    async fn find_environment_by_name(&self, name: &str) -> Result<Option<Environment>> {
        let environments: Vec<Environment> = self.get_json(&["environments", "all"]).await?;
        Ok(find_by_name(&environments, name))
    }

    async fn find_release(&self, project_id: &str, version: &str) -> Result<Option<Release>> {
        self.get_optional(&["projects", project_id, "releases", version])
            .await
    }

    async fn create_release(&self, request: &CreateReleaseRequest) -> Result<Release> {
        self.post_json(&["releases"], request).await
    }

    async fn trigger_deployment(&self, request: &DeploymentRequest) -> Result<Deployment> {
        let release = self
            .find_release(&request.project_id, &request.release_version)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "release {} of project {}",
                    request.release_version, request.project_id
                ))
            })?;

        let body = DeploymentBody {
            release_id: &release.id,
            environment_id: &request.environment_id,
        };
        self.post_json(&["deployments"], &body).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.get_json(&["tasks", task_id]).await
    }
}
