use std::sync::Arc;

use octopus_api::fakes::{MemoryDeploymentService, ServiceCall};
use octopus_api::{CreateReleaseRequest, DeploymentRequest, SelectedPackage, TaskState};
use octorelease_core::{
    BuildChain, BuildId, BuildLog, BuildRecord, BuildResult, ErrorKind, JobConfig, JobContext,
    PackageConfiguration, RecorderError, ReleaseOrchestrator, VariableResolver, WaitSettings,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn widgets_server() -> MemoryDeploymentService {
    MemoryDeploymentService::new()
        .with_project("Projects-1", "Widgets")
        .with_environment("Environments-1", "Staging")
}

fn widgets_job() -> JobConfig {
    JobConfig {
        project: "Widgets".to_string(),
        release_version: "1.2.3".to_string(),
        package_configs: vec![PackageConfiguration::new("core", "1.2.3")],
        ..JobConfig::default()
    }
}

fn deploying(mut config: JobConfig, wait: bool) -> JobConfig {
    config.deploy_this_release = true;
    config.environment = "Staging".to_string();
    config.wait_for_deployment = wait;
    config
}

fn fast_wait() -> WaitSettings {
    WaitSettings {
        poll_interval_secs: 1,
        timeout_secs: 10,
    }
}

fn history() -> BuildChain {
    BuildChain::new(vec![
        BuildRecord::new(1, BuildResult::Success).with_commit("a1", "initial import"),
        BuildRecord::new(2, BuildResult::Failure)
            .with_commit("b1", "add gears")
            .with_commit("b2", "fix gear ratio"),
        BuildRecord::new(3, BuildResult::InProgress).with_commit("c1", "tidy"),
    ])
}

// ---------------------------------------------------------------------------
// Release creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn release_without_notes_or_deploy_creates_exact_release() {
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let ok = orchestrator.perform(&widgets_job(), &ctx, &mut log).await;

    assert!(ok, "log:\n{}", capture.contents());
    assert_eq!(
        service.create_release_requests(),
        vec![CreateReleaseRequest {
            project_id: "Projects-1".to_string(),
            version: "1.2.3".to_string(),
            release_notes: None,
            selected_packages: vec![SelectedPackage::new("core", "1.2.3")],
        }]
    );
    assert!(service.deployment_requests().is_empty());

    let lines = capture.lines();
    assert_eq!(lines[0], "Started Octopus Release");
    assert!(lines.contains(&"Package Configurations:".to_string()));
    assert!(lines.contains(&"\tcore\tv1.2.3".to_string()));
    assert!(capture
        .contents()
        .contains("Created release 1.2.3 (Releases-1) for project 'Widgets'"));
}

#[tokio::test]
async fn unknown_project_aborts_before_create_release() {
    let service = Arc::new(MemoryDeploymentService::new().with_project("Projects-9", "Gadgets"));
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator.execute(&widgets_job(), &ctx, &mut log).await;

    assert!(!report.success());
    assert!(matches!(
        report.errors.as_slice(),
        [RecorderError::ProjectNotFound(name)] if name == "Widgets"
    ));
    assert_eq!(report.errors[0].kind(), ErrorKind::Resolution);
    assert!(service.create_release_requests().is_empty());
    assert!(report.release.is_none());
    assert!(capture
        .contents()
        .contains("FATAL: Project 'Widgets' was not found."));
}

#[tokio::test]
async fn unreachable_server_reports_lookup_failure() {
    let service = Arc::new(widgets_server().unreachable());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let ok = orchestrator.perform(&widgets_job(), &ctx, &mut log).await;

    assert!(!ok);
    assert!(capture
        .contents()
        .contains("Retrieving project name 'Widgets' failed with message"));
    assert!(service.create_release_requests().is_empty());
}

#[tokio::test]
async fn create_release_failure_skips_deployment() {
    let service = Arc::new(widgets_server().failing_create_release("version already taken"));
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator
        .execute(&deploying(widgets_job(), false), &ctx, &mut log)
        .await;

    assert!(!report.success());
    assert!(matches!(
        report.errors.as_slice(),
        [RecorderError::CreateRelease(_)]
    ));
    assert_eq!(service.create_release_requests().len(), 1);
    assert!(service.deployment_requests().is_empty());
    assert!(capture
        .contents()
        .contains("FATAL: Failed to create release: "));
}

#[tokio::test]
async fn no_deploy_never_looks_up_environment() {
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));
    let config = JobConfig {
        environment: "Staging".to_string(),
        ..widgets_job()
    };

    let (mut log, _capture) = BuildLog::capture();
    assert!(orchestrator.perform(&config, &ctx, &mut log).await);

    let calls = service.calls();
    assert!(!calls
        .iter()
        .any(|c| matches!(c, ServiceCall::FindEnvironment(_))));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, ServiceCall::TriggerDeployment(_))));
}

#[tokio::test]
async fn every_problem_is_reported_before_aborting() {
    let service = Arc::new(MemoryDeploymentService::new());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));
    let mut config = deploying(widgets_job(), false);
    config.release_notes = true;
    config.release_notes_source = "svn".to_string();

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator.execute(&config, &ctx, &mut log).await;

    assert_eq!(report.errors.len(), 3);
    let contents = capture.contents();
    assert!(contents.contains("FATAL: Project 'Widgets' was not found."));
    assert!(contents.contains("Found 'svn'"));
    assert!(contents.contains("FATAL: Environment 'Staging' was not found."));
    assert!(service.create_release_requests().is_empty());
}

#[tokio::test]
async fn inputs_are_substituted_from_job_variables() {
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let variables = VariableResolver::default().with("BUILD_NUMBER", "42");
    let ctx = JobContext::new(".", variables, &chain, BuildId(42));
    let config = JobConfig {
        release_version: "1.0.${BUILD_NUMBER}".to_string(),
        package_configs: vec![PackageConfiguration::new("core", "1.0.$BUILD_NUMBER")],
        ..widgets_job()
    };

    let (mut log, capture) = BuildLog::capture();
    assert!(orchestrator.perform(&config, &ctx, &mut log).await);

    let requests = service.create_release_requests();
    assert_eq!(requests[0].version, "1.0.42");
    assert_eq!(
        requests[0].selected_packages,
        vec![SelectedPackage::new("core", "1.0.42")]
    );
    // The header shows configured values.
    assert!(capture
        .lines()
        .contains(&"Release Version: 1.0.${BUILD_NUMBER}".to_string()));
}

#[tokio::test]
async fn duplicate_package_names_keep_last_version() {
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));
    let config = JobConfig {
        package_configs: vec![
            PackageConfiguration::new("core", "1.0.0"),
            PackageConfiguration::new("web", "2.0.0"),
            PackageConfiguration::new("core", "1.0.1"),
        ],
        ..widgets_job()
    };

    let (mut log, _capture) = BuildLog::capture();
    assert!(orchestrator.perform(&config, &ctx, &mut log).await);
    assert_eq!(
        service.create_release_requests()[0].selected_packages,
        vec![
            SelectedPackage::new("core", "1.0.1"),
            SelectedPackage::new("web", "2.0.0"),
        ]
    );
}

// ---------------------------------------------------------------------------
// Release notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_notes_are_sent_with_release() {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("notes.txt"), "fixed bug").unwrap();
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(workspace.path(), VariableResolver::default(), &chain, BuildId(1));
    let config = JobConfig {
        release_notes: true,
        release_notes_source: "file".to_string(),
        release_notes_file: "notes.txt".to_string(),
        ..widgets_job()
    };

    let (mut log, _capture) = BuildLog::capture();
    assert!(orchestrator.perform(&config, &ctx, &mut log).await);
    assert_eq!(
        service.create_release_requests()[0].release_notes.as_deref(),
        Some("fixed bug")
    );
}

#[tokio::test]
async fn unreadable_notes_file_fails_without_create_release() {
    let workspace = tempfile::tempdir().unwrap();
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(workspace.path(), VariableResolver::default(), &chain, BuildId(1));
    let config = JobConfig {
        release_notes: true,
        release_notes_source: "file".to_string(),
        release_notes_file: "missing.txt".to_string(),
        ..widgets_job()
    };

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator.execute(&config, &ctx, &mut log).await;

    assert!(!report.success());
    assert_eq!(report.errors[0].kind(), ErrorKind::LocalIo);
    assert!(service.create_release_requests().is_empty());
    assert!(capture
        .contents()
        .contains("Unable to get file contents from release notes file"));
}

#[tokio::test]
async fn scm_notes_collect_commits_since_last_success() {
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = history();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(3));
    let config = JobConfig {
        release_notes: true,
        release_notes_source: "scm".to_string(),
        ..widgets_job()
    };

    let (mut log, _capture) = BuildLog::capture();
    assert!(orchestrator.perform(&config, &ctx, &mut log).await);
    assert_eq!(
        service.create_release_requests()[0].release_notes.as_deref(),
        Some("add gears\nfix gear ratio\n")
    );
}

#[tokio::test]
async fn scm_notes_without_intermediate_builds_are_empty() {
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::new(vec![
        BuildRecord::new(1, BuildResult::Success).with_commit("a1", "initial import"),
        BuildRecord::new(2, BuildResult::InProgress).with_commit("b1", "current work"),
    ]);
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(2));
    let config = JobConfig {
        release_notes: true,
        release_notes_source: "scm".to_string(),
        ..widgets_job()
    };

    let (mut log, _capture) = BuildLog::capture();
    assert!(orchestrator.perform(&config, &ctx, &mut log).await);
    assert_eq!(
        service.create_release_requests()[0].release_notes.as_deref(),
        Some("")
    );
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deploy_triggers_deployment_of_created_release() {
    let service = Arc::new(widgets_server());
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator
        .execute(&deploying(widgets_job(), false), &ctx, &mut log)
        .await;

    assert!(report.success(), "log:\n{}", capture.contents());
    assert_eq!(
        service.deployment_requests(),
        vec![DeploymentRequest {
            project_id: "Projects-1".to_string(),
            release_version: "1.2.3".to_string(),
            environment_id: "Environments-1".to_string(),
        }]
    );
    let deployment = report.deployment.expect("deployment");
    assert_eq!(deployment.release_id, "Releases-1");
    assert!(report.task.is_none());
    assert!(!service
        .calls()
        .iter()
        .any(|c| matches!(c, ServiceCall::GetTask(_))));
}

#[tokio::test]
async fn deployment_failure_keeps_created_release() {
    let service = Arc::new(widgets_server().failing_deployment("tentacle offline"));
    let orchestrator = ReleaseOrchestrator::new(service.clone(), WaitSettings::default());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator
        .execute(&deploying(widgets_job(), false), &ctx, &mut log)
        .await;

    assert!(!report.success());
    assert!(report.release.is_some());
    assert_eq!(service.releases().len(), 1);
    assert!(capture.contents().contains("tentacle offline"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_successful_deployment() {
    let service = Arc::new(widgets_server().with_task_states(&[
        TaskState::Queued,
        TaskState::Executing,
        TaskState::Success,
    ]));
    let orchestrator = ReleaseOrchestrator::new(service.clone(), fast_wait());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator
        .execute(&deploying(widgets_job(), true), &ctx, &mut log)
        .await;

    assert!(report.success(), "log:\n{}", capture.contents());
    let task = report.task.expect("task");
    assert_eq!(task.state, TaskState::Success);
    let contents = capture.contents();
    assert!(contents.contains("Task ServerTasks-1 state: Queued"));
    assert!(contents.contains("Task ServerTasks-1 state: Executing"));
    assert!(contents.contains("Deployment task ServerTasks-1 completed successfully"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_failed_deployment() {
    let service =
        Arc::new(widgets_server().with_task_states(&[TaskState::Executing, TaskState::Failed]));
    let orchestrator = ReleaseOrchestrator::new(service.clone(), fast_wait());
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator
        .execute(&deploying(widgets_job(), true), &ctx, &mut log)
        .await;

    assert!(!report.success());
    assert!(matches!(
        report.errors.as_slice(),
        [RecorderError::DeploymentFailed { state, .. }] if state == "Failed"
    ));
    assert_eq!(report.errors[0].kind(), ErrorKind::RemoteCall);
    assert!(capture
        .contents()
        .contains("FATAL: Deployment task ServerTasks-1 finished in state Failed"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_deployment_times_out() {
    let service = Arc::new(widgets_server().with_task_states(&[TaskState::Executing]));
    let orchestrator = ReleaseOrchestrator::new(
        service.clone(),
        WaitSettings {
            poll_interval_secs: 2,
            timeout_secs: 5,
        },
    );
    let chain = BuildChain::default();
    let ctx = JobContext::new(".", VariableResolver::default(), &chain, BuildId(1));

    let (mut log, capture) = BuildLog::capture();
    let report = orchestrator
        .execute(&deploying(widgets_job(), true), &ctx, &mut log)
        .await;

    assert!(matches!(
        report.errors.as_slice(),
        [RecorderError::DeploymentTimedOut { timeout_secs: 5, .. }]
    ));
    assert!(capture
        .contents()
        .contains("did not complete within 5s"));
    // State changes are logged once.
    assert_eq!(
        capture
            .lines()
            .iter()
            .filter(|l| l.starts_with("Task ServerTasks-1 state:"))
            .count(),
        1
    );
}
