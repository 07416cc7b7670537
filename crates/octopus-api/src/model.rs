//! Wire model for the Octopus Deploy REST API.
//!
//! Octopus serializes resources with PascalCase keys; every resource here
//! carries `#[serde(rename_all = "PascalCase")]` so the structs can be used
//! directly as request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project as defined in Octopus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// A named deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    pub id: String,
    pub name: String,
}

/// A versioned release of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Release {
    pub id: String,
    pub project_id: String,
    pub version: String,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub assembled: Option<DateTime<Utc>>,
    #[serde(default)]
    pub selected_packages: Vec<SelectedPackage>,
}

/// Package pinned to a specific version inside a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectedPackage {
    /// Deployment step (named after the package) the version applies to.
    pub step_name: String,
    pub version: String,
}

impl SelectedPackage {
    pub fn new(step_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            version: version.into(),
        }
    }
}

/// Body of `POST api/releases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateReleaseRequest {
    pub project_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub selected_packages: Vec<SelectedPackage>,
}

/// Request to deploy an existing release into an environment.
///
/// The server addresses releases by id, so clients resolve
/// `(project_id, release_version)` before issuing the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub project_id: String,
    pub release_version: String,
    pub environment_id: String,
}

/// Body of `POST api/deployments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeploymentBody<'a> {
    pub release_id: &'a str,
    pub environment_id: &'a str,
}

/// A deployment created on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deployment {
    pub id: String,
    pub release_id: String,
    pub environment_id: String,
    /// Server task that executes the deployment.
    pub task_id: String,
}

/// Lifecycle state of a server task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Queued,
    Executing,
    Cancelling,
    Success,
    Failed,
    Canceled,
    TimedOut,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Failed | TaskState::Canceled | TaskState::TimedOut
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskState::Queued => "Queued",
            TaskState::Executing => "Executing",
            TaskState::Cancelling => "Cancelling",
            TaskState::Success => "Success",
            TaskState::Failed => "Failed",
            TaskState::Canceled => "Canceled",
            TaskState::TimedOut => "TimedOut",
            TaskState::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// A server task (deployments run as tasks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    pub id: String,
    pub state: TaskState,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub finished_successfully: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Error body returned by Octopus on 4xx/5xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ErrorResponse {
    pub fn describe(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(message) = self.error_message.as_deref() {
            parts.push(message);
        }
        parts.extend(self.errors.iter().map(String::as_str));
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Resources that are looked up by display name.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for Project {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Environment {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Find a resource by name: exact match first, then ignoring ASCII case.
///
/// The case-insensitive fallback lets callers detect a name that only
/// differs in letter case and suggest the canonical spelling.
pub fn find_by_name<T: Named + Clone>(items: &[T], name: &str) -> Option<T> {
    items
        .iter()
        .find(|item| item.name() == name)
        .or_else(|| items.iter().find(|item| item.name().eq_ignore_ascii_case(name)))
        .cloned()
}
