//! The deployment server seam.
//!
//! `DeploymentService` is what the release tooling depends on. The HTTP
//! implementation lives in `client`; an in-memory one lives in `fakes`.

use async_trait::async_trait;

use crate::model::{
    CreateReleaseRequest, Deployment, DeploymentRequest, Environment, Project, Release, Task,
};
use crate::Result;

/// Operations consumed from the deployment server.
///
/// Contract:
/// - Lookups return `Ok(None)` when the resource does not exist.
/// - Name lookups prefer an exact match and fall back to a case-insensitive one.
/// - Every call is a single attempt; implementations do not retry.
#[async_trait]
pub trait DeploymentService: Send + Sync {
    /// Look up a project by its display name.
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>>;

    /// Look up an environment by its display name.
    async fn find_environment_by_name(&self, name: &str) -> Result<Option<Environment>>;

    /// Look up a release of a project by version.
    async fn find_release(&self, project_id: &str, version: &str) -> Result<Option<Release>>;

    /// Create a release. Fails if the server rejects it.
    async fn create_release(&self, request: &CreateReleaseRequest) -> Result<Release>;

    /// Deploy an existing release into an environment.
    async fn trigger_deployment(&self, request: &DeploymentRequest) -> Result<Deployment>;

    /// Fetch the current state of a server task.
    async fn get_task(&self, task_id: &str) -> Result<Task>;
}
