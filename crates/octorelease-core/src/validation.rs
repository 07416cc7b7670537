//! Interactive field checks for the release step configuration.
//!
//! Every check is read-only against the server and never fails: an
//! unreachable server degrades to a warning.

use std::sync::Arc;

use octopus_api::{DeploymentService, Environment, Project};

const PROJECT_RELEASE_VALIDATION_MESSAGE: &str = "Project must be set to validate release.";

/// Outcome of a field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValidation {
    Ok,
    Warning(String),
    Error(String),
}

impl FormValidation {
    pub fn is_ok(&self) -> bool {
        matches!(self, FormValidation::Ok)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormValidation::Error(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            FormValidation::Ok => None,
            FormValidation::Warning(m) | FormValidation::Error(m) => Some(m),
        }
    }
}

impl std::fmt::Display for FormValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormValidation::Ok => f.write_str("OK"),
            FormValidation::Warning(m) => write!(f, "WARNING: {m}"),
            FormValidation::Error(m) => write!(f, "ERROR: {m}"),
        }
    }
}

/// Field checks backed by a deployment server.
pub struct ValidationService {
    service: Arc<dyn DeploymentService>,
}

impl ValidationService {
    pub fn new(service: Arc<dyn DeploymentService>) -> Self {
        Self { service }
    }

    /// The project exists, with exactly this spelling.
    pub async fn check_project(&self, project: &str) -> FormValidation {
        let project = project.trim();
        if project.is_empty() {
            return FormValidation::Warning("Please provide a project name.".to_string());
        }
        match self.service.find_project_by_name(project).await {
            Ok(Some(Project { name, .. })) => named_match("Project", project, &name),
            Ok(None) => FormValidation::Error("Project not found.".to_string()),
            Err(e) => FormValidation::Warning(format!("Unable to validate field - {e}")),
        }
    }

    /// The environment exists, with exactly this spelling.
    pub async fn check_environment(&self, environment: &str) -> FormValidation {
        let environment = environment.trim();
        if environment.is_empty() {
            return FormValidation::Warning("Please provide an environment name.".to_string());
        }
        match self.service.find_environment_by_name(environment).await {
            Ok(Some(Environment { name, .. })) => named_match("Environment", environment, &name),
            Ok(None) => FormValidation::Error("Environment not found.".to_string()),
            Err(e) => FormValidation::Warning(format!("Unable to validate field - {e}")),
        }
    }

    /// The version is set and no release of `project` uses it yet.
    pub async fn check_release_version(&self, release_version: &str, project: &str) -> FormValidation {
        let release_version = release_version.trim();
        if release_version.is_empty() {
            return FormValidation::Error("Please provide a release version.".to_string());
        }
        let project = project.trim();
        if project.is_empty() {
            return FormValidation::Warning(PROJECT_RELEASE_VALIDATION_MESSAGE.to_string());
        }
        let project = match self.service.find_project_by_name(project).await {
            Ok(Some(project)) => project,
            Ok(None) | Err(_) => {
                return FormValidation::Warning(PROJECT_RELEASE_VALIDATION_MESSAGE.to_string())
            }
        };
        match self.service.find_release(&project.id, release_version).await {
            Ok(Some(_)) => FormValidation::Error(format!(
                "Release {release_version} already exists for project '{}'!",
                project.name
            )),
            Ok(None) => FormValidation::Ok,
            Err(e) => FormValidation::Warning(format!("Unable to validate field - {e}")),
        }
    }

    /// The notes file path is set.
    pub fn check_release_notes_file(&self, release_notes_file: &str) -> FormValidation {
        if release_notes_file.trim().is_empty() {
            return FormValidation::Error("Please provide a project notes file.".to_string());
        }
        FormValidation::Ok
    }
}

fn named_match(kind: &str, given: &str, canonical: &str) -> FormValidation {
    if given == canonical {
        FormValidation::Ok
    } else {
        FormValidation::Warning(format!(
            "{kind} name case does not match. Did you mean '{canonical}'?"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_match() {
        assert!(named_match("Project", "Widgets", "Widgets").is_ok());
        let warning = named_match("Project", "widgets", "Widgets");
        assert_eq!(
            warning.message(),
            Some("Project name case does not match. Did you mean 'Widgets'?")
        );
        assert!(!warning.is_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(FormValidation::Ok.to_string(), "OK");
        assert_eq!(
            FormValidation::Error("bad".to_string()).to_string(),
            "ERROR: bad"
        );
        assert_eq!(
            FormValidation::Warning("hmm".to_string()).to_string(),
            "WARNING: hmm"
        );
    }
}
