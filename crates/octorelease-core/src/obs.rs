//! Structured tracing events for the release lifecycle.
//!
//! These are for log aggregation; the job-visible output is the build log.

use tracing::info;

/// Span covering one release step; attach with `tracing::Instrument`.
pub fn release_span(project: &str, release_version: &str) -> tracing::Span {
    tracing::info_span!(
        "octorelease.release",
        project = %project,
        release_version = %release_version
    )
}

pub fn emit_release_started(project: &str, release_version: &str, deploy: bool) {
    info!(
        event = "release.started",
        project = %project,
        release_version = %release_version,
        deploy = deploy,
    );
}

pub fn emit_release_created(project_id: &str, release_id: &str, release_version: &str) {
    info!(
        event = "release.created",
        project_id = %project_id,
        release_id = %release_id,
        release_version = %release_version,
    );
}

pub fn emit_deployment_triggered(release_version: &str, environment_id: &str, task_id: &str) {
    info!(
        event = "deployment.triggered",
        release_version = %release_version,
        environment_id = %environment_id,
        task_id = %task_id,
    );
}

pub fn emit_deployment_finished(task_id: &str, state: &str, success: bool) {
    info!(
        event = "deployment.finished",
        task_id = %task_id,
        state = %state,
        success = success,
    );
}

/// Warning-level: the release step failed.
pub fn emit_release_failed(project: &str, problems: usize) {
    tracing::warn!(event = "release.failed", project = %project, problems = problems);
}
