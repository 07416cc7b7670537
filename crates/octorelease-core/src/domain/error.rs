//! Domain-level error taxonomy for release recording.

use std::path::PathBuf;

use octopus_api::ApiError;

/// Broad classes of failure, mirrored in the build log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or contradictory job configuration.
    Configuration,
    /// A named project or environment could not be resolved.
    Resolution,
    /// Create-release, trigger-deployment or the deployment task failed.
    RemoteCall,
    /// Local file access failed.
    LocalIo,
}

/// Release recording errors.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Bad configuration: {0}")]
    Configuration(String),

    #[error("Retrieving project name '{name}' failed with message '{source}'")]
    ProjectLookup {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("Project '{0}' was not found.")]
    ProjectNotFound(String),

    #[error("Retrieving environment name '{name}' failed with message '{source}'")]
    EnvironmentLookup {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("Environment '{0}' was not found.")]
    EnvironmentNotFound(String),

    #[error("Failed to create release: {0}")]
    CreateRelease(#[source] ApiError),

    #[error("Failed to deploy release: {0}")]
    TriggerDeployment(#[source] ApiError),

    #[error("Failed to check deployment task {task_id}: {source}")]
    TaskStatus {
        task_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Deployment task {task_id} finished in state {state}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    DeploymentFailed {
        task_id: String,
        state: String,
        message: Option<String>,
    },

    #[error("Deployment task {task_id} did not complete within {timeout_secs}s")]
    DeploymentTimedOut { task_id: String, timeout_secs: u64 },

    #[error("Unable to get file contents from release notes file {} - {source}", .path.display())]
    ReleaseNotesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git error: {0}")]
    GitError(String),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecorderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecorderError::Configuration(_) | RecorderError::Settings(_) => {
                ErrorKind::Configuration
            }
            RecorderError::ProjectLookup { .. }
            | RecorderError::ProjectNotFound(_)
            | RecorderError::EnvironmentLookup { .. }
            | RecorderError::EnvironmentNotFound(_) => ErrorKind::Resolution,
            RecorderError::CreateRelease(_)
            | RecorderError::TriggerDeployment(_)
            | RecorderError::TaskStatus { .. }
            | RecorderError::DeploymentFailed { .. }
            | RecorderError::DeploymentTimedOut { .. } => ErrorKind::RemoteCall,
            RecorderError::ReleaseNotesFile { .. }
            | RecorderError::GitError(_)
            | RecorderError::Serialization(_)
            | RecorderError::Io(_) => ErrorKind::LocalIo,
        }
    }
}

/// Result type for release recording operations.
pub type Result<T> = std::result::Result<T, RecorderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            RecorderError::Configuration("x".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            RecorderError::ProjectNotFound("Widgets".to_string()).kind(),
            ErrorKind::Resolution
        );
        assert_eq!(
            RecorderError::CreateRelease(ApiError::Http("down".to_string())).kind(),
            ErrorKind::RemoteCall
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(
            RecorderError::ReleaseNotesFile {
                path: PathBuf::from("notes.txt"),
                source: io,
            }
            .kind(),
            ErrorKind::LocalIo
        );
    }

    #[test]
    fn test_deployment_failed_display() {
        let err = RecorderError::DeploymentFailed {
            task_id: "ServerTasks-1".to_string(),
            state: "Failed".to_string(),
            message: Some("step 2 failed".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Deployment task ServerTasks-1 finished in state Failed: step 2 failed"
        );

        let bare = RecorderError::DeploymentFailed {
            task_id: "ServerTasks-1".to_string(),
            state: "Canceled".to_string(),
            message: None,
        };
        assert_eq!(
            bare.to_string(),
            "Deployment task ServerTasks-1 finished in state Canceled"
        );
    }

    #[test]
    fn test_project_lookup_display() {
        let err = RecorderError::ProjectLookup {
            name: "Widgets".to_string(),
            source: ApiError::Http("connection refused".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("Widgets"));
        assert!(msg.contains("connection refused"));
    }
}
