//! In-memory fakes for the deployment server (testing only)
//!
//! `MemoryDeploymentService` satisfies the `DeploymentService` contract
//! without any network, records every call it receives, and can be told to
//! fail specific operations.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ApiError;
use crate::model::*;
use crate::service::DeploymentService;
use crate::Result;

/// A call observed by the fake, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    FindProject(String),
    FindEnvironment(String),
    FindRelease { project_id: String, version: String },
    CreateRelease(CreateReleaseRequest),
    TriggerDeployment(DeploymentRequest),
    GetTask(String),
}

#[derive(Debug, Default)]
struct FakeState {
    projects: Vec<Project>,
    environments: Vec<Environment>,
    releases: Vec<Release>,
    deployments: Vec<Deployment>,
    task_states: VecDeque<TaskState>,
    unreachable: bool,
    create_release_error: Option<String>,
    deployment_error: Option<String>,
    calls: Vec<ServiceCall>,
}

/// In-memory deployment server.
#[derive(Debug, Default)]
pub struct MemoryDeploymentService {
    state: Mutex<FakeState>,
}

impl MemoryDeploymentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project.
    pub fn with_project(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().projects.push(Project {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Register an environment.
    pub fn with_environment(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().environments.push(Environment {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Register an existing release.
    pub fn with_release(self, project_id: &str, version: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = format!("Releases-{}", state.releases.len() + 1);
            state.releases.push(Release {
                id,
                project_id: project_id.to_string(),
                version: version.to_string(),
                release_notes: None,
                assembled: Some(Utc::now()),
                selected_packages: Vec::new(),
            });
        }
        self
    }

    /// Every call fails with a transport error.
    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    /// `create_release` fails with a server error carrying `message`.
    pub fn failing_create_release(self, message: &str) -> Self {
        self.state.lock().unwrap().create_release_error = Some(message.to_string());
        self
    }

    /// `trigger_deployment` fails with a server error carrying `message`.
    pub fn failing_deployment(self, message: &str) -> Self {
        self.state.lock().unwrap().deployment_error = Some(message.to_string());
        self
    }

    /// States reported by successive `get_task` calls; the last one repeats.
    /// Defaults to an immediately successful task.
    pub fn with_task_states(self, states: &[TaskState]) -> Self {
        self.state.lock().unwrap().task_states = states.iter().copied().collect();
        self
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Requests received by `create_release`, including rejected ones.
    pub fn create_release_requests(&self) -> Vec<CreateReleaseRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ServiceCall::CreateRelease(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Requests received by `trigger_deployment`, including rejected ones.
    pub fn deployment_requests(&self) -> Vec<DeploymentRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ServiceCall::TriggerDeployment(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn releases(&self) -> Vec<Release> {
        self.state.lock().unwrap().releases.clone()
    }

    pub fn deployments(&self) -> Vec<Deployment> {
        self.state.lock().unwrap().deployments.clone()
    }

    /// Record `call` and fail if the server is marked unreachable.
    fn record(&self, call: ServiceCall) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.unreachable {
            return Err(ApiError::Http("connection refused".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl DeploymentService for MemoryDeploymentService {
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let state = self.record(ServiceCall::FindProject(name.to_string()))?;
        Ok(find_by_name(&state.projects, name))
    }

    async fn find_environment_by_name(&self, name: &str) -> Result<Option<Environment>> {
        let state = self.record(ServiceCall::FindEnvironment(name.to_string()))?;
        Ok(find_by_name(&state.environments, name))
    }

    async fn find_release(&self, project_id: &str, version: &str) -> Result<Option<Release>> {
        let state = self.record(ServiceCall::FindRelease {
            project_id: project_id.to_string(),
            version: version.to_string(),
        })?;
        Ok(state
            .releases
            .iter()
            .find(|r| r.project_id == project_id && r.version == version)
            .cloned())
    }

    async fn create_release(&self, request: &CreateReleaseRequest) -> Result<Release> {
        let mut state = self.record(ServiceCall::CreateRelease(request.clone()))?;
        if let Some(message) = state.create_release_error.clone() {
            return Err(ApiError::Status {
                status: 400,
                message,
            });
        }
        if !state.projects.iter().any(|p| p.id == request.project_id) {
            return Err(ApiError::NotFound(format!("project {}", request.project_id)));
        }
        if state
            .releases
            .iter()
            .any(|r| r.project_id == request.project_id && r.version == request.version)
        {
            return Err(ApiError::Status {
                status: 400,
                message: format!("A release with the version {} already exists", request.version),
            });
        }

        let release = Release {
            id: format!("Releases-{}", state.releases.len() + 1),
            project_id: request.project_id.clone(),
            version: request.version.clone(),
            release_notes: request.release_notes.clone(),
            assembled: Some(Utc::now()),
            selected_packages: request.selected_packages.clone(),
        };
        state.releases.push(release.clone());
        Ok(release)
    }

    async fn trigger_deployment(&self, request: &DeploymentRequest) -> Result<Deployment> {
        let mut state = self.record(ServiceCall::TriggerDeployment(request.clone()))?;
        if let Some(message) = state.deployment_error.clone() {
            return Err(ApiError::Status {
                status: 500,
                message,
            });
        }
        let release_id = state
            .releases
            .iter()
            .find(|r| r.project_id == request.project_id && r.version == request.release_version)
            .map(|r| r.id.clone())
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "release {} of project {}",
                    request.release_version, request.project_id
                ))
            })?;

        let n = state.deployments.len() + 1;
        let deployment = Deployment {
            id: format!("Deployments-{n}"),
            release_id,
            environment_id: request.environment_id.clone(),
            task_id: format!("ServerTasks-{n}"),
        };
        state.deployments.push(deployment.clone());
        Ok(deployment)
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        let mut state = self.record(ServiceCall::GetTask(task_id.to_string()))?;
        if !state.deployments.iter().any(|d| d.task_id == task_id) {
            return Err(ApiError::Status {
                status: 404,
                message: format!("task {task_id} not found"),
            });
        }
        let task_state = if state.task_states.len() > 1 {
            state.task_states.pop_front().unwrap_or(TaskState::Success)
        } else {
            state.task_states.front().copied().unwrap_or(TaskState::Success)
        };
        let is_completed = task_state.is_terminal();
        let finished_successfully = task_state == TaskState::Success;
        Ok(Task {
            id: task_id.to_string(),
            state: task_state,
            is_completed,
            finished_successfully,
            error_message: (is_completed && !finished_successfully)
                .then(|| format!("task ended in state {task_state}")),
        })
    }
}
