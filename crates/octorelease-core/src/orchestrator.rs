//! Create a release and optionally deploy it.
//!
//! Sequence for one job execution:
//!
//! 1. Resolve the project by name
//! 2. Resolve release notes (if requested)
//! 3. Resolve the target environment (if deploying)
//! 4. Abort before touching the server if any of the above failed
//! 5. Create the release with the selected packages
//! 6. Trigger the deployment (if requested) and optionally wait for its task
//!
//! Steps 1-3 always all run, so the build log lists every problem at once.
//! Each remote call is a single attempt. A failed deployment leaves the
//! created release in place.

use std::sync::Arc;

use octopus_api::{
    CreateReleaseRequest, Deployment, DeploymentRequest, DeploymentService, Environment,
    Project, Release, Task,
};
use tracing::Instrument;

use crate::build_log::BuildLog;
use crate::config::{JobConfig, WaitSettings};
use crate::context::JobContext;
use crate::domain::error::{RecorderError, Result};
use crate::domain::package::{PackageSelection, PackageSelectionSet};
use crate::notes::ReleaseNotesProvider;
use crate::obs::{
    emit_deployment_finished, emit_deployment_triggered, emit_release_created,
    emit_release_failed, emit_release_started, release_span,
};

/// What a release step did.
#[derive(Debug, Default)]
pub struct ReleaseReport {
    pub release: Option<Release>,
    pub deployment: Option<Deployment>,
    /// Final state of the deployment task, when waited for.
    pub task: Option<Task>,
    pub errors: Vec<RecorderError>,
}

impl ReleaseReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, log: &mut BuildLog, error: RecorderError) {
        log.fatal(&error.to_string());
        self.errors.push(error);
    }
}

/// Job configuration values after variable substitution.
struct ResolvedInputs {
    project: String,
    release_version: String,
    release_notes_file: String,
    environment: String,
}

/// Runs the release step against a deployment server.
pub struct ReleaseOrchestrator {
    service: Arc<dyn DeploymentService>,
    wait: WaitSettings,
}

impl ReleaseOrchestrator {
    pub fn new(service: Arc<dyn DeploymentService>, wait: WaitSettings) -> Self {
        Self { service, wait }
    }

    /// Run the release step; `true` when every requested action succeeded.
    ///
    /// Diagnostics are written to `log`; nothing is returned but the status.
    pub async fn perform(
        &self,
        config: &JobConfig,
        context: &JobContext<'_>,
        log: &mut BuildLog,
    ) -> bool {
        self.execute(config, context, log).await.success()
    }

    /// Run the release step and report what was created.
    pub async fn execute(
        &self,
        config: &JobConfig,
        context: &JobContext<'_>,
        log: &mut BuildLog,
    ) -> ReleaseReport {
        let config = config.clone().normalized();
        log.start_header(&config);

        let inputs = ResolvedInputs {
            project: context.substitute(&config.project),
            release_version: context.substitute(&config.release_version),
            release_notes_file: context.substitute(&config.release_notes_file),
            environment: context.substitute(&config.environment),
        };
        let span = release_span(&inputs.project, &inputs.release_version);
        self.run(&config, &inputs, context, log)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        config: &JobConfig,
        inputs: &ResolvedInputs,
        context: &JobContext<'_>,
        log: &mut BuildLog,
    ) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        emit_release_started(
            &inputs.project,
            &inputs.release_version,
            config.deploy_this_release,
        );

        if inputs.release_version.is_empty() {
            report.fail(
                log,
                RecorderError::Configuration("release version must not be empty".to_string()),
            );
        }

        let project = match self.resolve_project(&inputs.project).await {
            Ok(project) => Some(project),
            Err(e) => {
                report.fail(log, e);
                None
            }
        };

        let release_notes = if config.release_notes {
            match ReleaseNotesProvider::new(context)
                .resolve(&config.release_notes_source, &inputs.release_notes_file)
            {
                Ok(notes) => Some(notes),
                Err(e) => {
                    report.fail(log, e);
                    None
                }
            }
        } else {
            None
        };

        let environment = if config.deploy_this_release {
            match self.resolve_environment(&inputs.environment).await {
                Ok(environment) => Some(environment),
                Err(e) => {
                    report.fail(log, e);
                    None
                }
            }
        } else {
            None
        };

        let project = match project {
            Some(project) if report.success() => project,
            _ => {
                log.fatal("Release was not created; fix the problems above and re-run.");
                emit_release_failed(&inputs.project, report.errors.len());
                return report;
            }
        };

        let packages: PackageSelectionSet = config
            .package_configs
            .iter()
            .map(|pc| PackageSelection {
                package_name: context.substitute(&pc.package_name),
                version: context.substitute(&pc.package_version),
            })
            .collect();

        let request = CreateReleaseRequest {
            project_id: project.id.clone(),
            version: inputs.release_version.clone(),
            release_notes,
            selected_packages: packages.to_selected_packages(),
        };
        let release = match self.service.create_release(&request).await {
            Ok(release) => release,
            Err(e) => {
                report.fail(log, RecorderError::CreateRelease(e));
                emit_release_failed(&inputs.project, report.errors.len());
                return report;
            }
        };
        log.info(&format!(
            "Created release {} ({}) for project '{}'",
            release.version, release.id, project.name
        ));
        emit_release_created(&project.id, &release.id, &release.version);

        if let Some(environment) = environment {
            self.deploy(&project, &release, &environment, config, log, &mut report)
                .await;
        }
        report.release = Some(release);

        if !report.success() {
            emit_release_failed(&inputs.project, report.errors.len());
        }
        report
    }

    async fn resolve_project(&self, name: &str) -> Result<Project> {
        self.service
            .find_project_by_name(name)
            .await
            .map_err(|source| RecorderError::ProjectLookup {
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| RecorderError::ProjectNotFound(name.to_string()))
    }

    async fn resolve_environment(&self, name: &str) -> Result<Environment> {
        self.service
            .find_environment_by_name(name)
            .await
            .map_err(|source| RecorderError::EnvironmentLookup {
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| RecorderError::EnvironmentNotFound(name.to_string()))
    }

    async fn deploy(
        &self,
        project: &Project,
        release: &Release,
        environment: &Environment,
        config: &JobConfig,
        log: &mut BuildLog,
        report: &mut ReleaseReport,
    ) {
        let request = DeploymentRequest {
            project_id: project.id.clone(),
            release_version: release.version.clone(),
            environment_id: environment.id.clone(),
        };
        log.info(&format!(
            "Deploying release {} to environment '{}'",
            release.version, environment.name
        ));

        let deployment = match self.service.trigger_deployment(&request).await {
            Ok(deployment) => deployment,
            Err(e) => {
                report.fail(log, RecorderError::TriggerDeployment(e));
                return;
            }
        };
        log.info(&format!(
            "Deployment {} queued as task {}",
            deployment.id, deployment.task_id
        ));
        emit_deployment_triggered(&release.version, &environment.id, &deployment.task_id);

        if config.wait_for_deployment {
            match self.wait_for_task(&deployment.task_id, log).await {
                Ok(task) => {
                    log.info(&format!("Deployment task {} completed successfully", task.id));
                    report.task = Some(task);
                }
                Err(e) => report.fail(log, e),
            }
        }
        report.deployment = Some(deployment);
    }

    /// Poll a server task until it completes or the wait timeout elapses.
    async fn wait_for_task(&self, task_id: &str, log: &mut BuildLog) -> Result<Task> {
        let deadline = tokio::time::Instant::now() + self.wait.timeout();
        let mut last_state = None;
        loop {
            let task = self
                .service
                .get_task(task_id)
                .await
                .map_err(|source| RecorderError::TaskStatus {
                    task_id: task_id.to_string(),
                    source,
                })?;

            if last_state != Some(task.state) {
                log.info(&format!("Task {} state: {}", task_id, task.state));
                last_state = Some(task.state);
            }

            if task.is_completed {
                emit_deployment_finished(
                    task_id,
                    &task.state.to_string(),
                    task.finished_successfully,
                );
                if task.finished_successfully {
                    return Ok(task);
                }
                return Err(RecorderError::DeploymentFailed {
                    task_id: task_id.to_string(),
                    state: task.state.to_string(),
                    message: task.error_message,
                });
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(RecorderError::DeploymentTimedOut {
                    task_id: task_id.to_string(),
                    timeout_secs: self.wait.timeout_secs,
                });
            }
            tokio::time::sleep(self.wait.poll_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::build::{BuildChain, BuildId};
    use crate::substitute::VariableResolver;
    use octopus_api::fakes::{MemoryDeploymentService, ServiceCall};

    #[tokio::test]
    async fn test_empty_release_version_aborts_before_create() {
        let service = Arc::new(MemoryDeploymentService::new().with_project("Projects-1", "Widgets"));
        let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
        let chain = BuildChain::default();
        let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));
        let config = JobConfig {
            project: "Widgets".to_string(),
            release_version: "   ".to_string(),
            ..JobConfig::default()
        };

        let (mut log, capture) = BuildLog::capture();
        let report = orchestrator.execute(&config, &ctx, &mut log).await;

        assert!(!report.success());
        assert!(service.create_release_requests().is_empty());
        assert_eq!(
            service.calls(),
            vec![ServiceCall::FindProject("Widgets".to_string())]
        );
        assert!(capture
            .contents()
            .contains("FATAL: Bad configuration: release version must not be empty"));
    }
}
