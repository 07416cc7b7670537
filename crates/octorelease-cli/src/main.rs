//! Octorelease CLI
//!
//! The `octorelease` command runs the Octopus Deploy release step of a CI job.
//!
//! ## Commands
//!
//! - `release`: Create a release and optionally deploy it
//! - `validate`: Check step configuration against the server
//! - `metadata`: Write package build information as JSON

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use octopus_api::{DeploymentService, OctopusClient};
use octorelease_core::{
    BuildChain, BuildId, BuildLog, FormValidation, JobConfig, JobContext, PackageConfiguration,
    PackageMetadata, ReleaseOrchestrator, Settings, ValidationService, VariableResolver,
};
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "octorelease")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Create and deploy Octopus Deploy releases from CI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Settings file (TOML) with the server connection
    #[arg(long, global = true, env = "OCTORELEASE_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a release, optionally deploying it
    Release {
        #[command(flatten)]
        build: BuildArgs,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Validate release step fields against the server
    Validate {
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        environment: Option<String>,

        /// Checked for an existing release of --project
        #[arg(long)]
        release_version: Option<String>,

        #[arg(long)]
        notes_file: Option<String>,
    },

    /// Print build information for packages of the running build
    Metadata {
        #[command(flatten)]
        build: BuildArgs,

        /// Issue tracker comment parser name
        #[arg(long)]
        comment_parser: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Job workspace; relative notes paths resolve here
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    /// Build history exported by the CI server (JSON)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Number of the running build (defaults to the last recorded build)
    #[arg(long, env = "BUILD_NUMBER")]
    build: Option<u64>,
}

/// Job configuration flags; each one overrides the `--job` file.
#[derive(Args, Debug, Default)]
struct JobArgs {
    /// Job configuration file (TOML)
    #[arg(long)]
    job: Option<PathBuf>,

    #[arg(long)]
    project: Option<String>,

    #[arg(long)]
    release_version: Option<String>,

    /// Attach release notes from `file` or `scm`
    #[arg(long)]
    notes_source: Option<String>,

    #[arg(long)]
    notes_file: Option<String>,

    /// Deploy the release to this environment
    #[arg(long)]
    environment: Option<String>,

    /// Wait for the deployment task to finish
    #[arg(long)]
    wait: bool,

    /// Package version to pin, as NAME=VERSION (repeatable)
    #[arg(long = "package", value_name = "NAME=VERSION")]
    packages: Vec<PackageConfiguration>,
}

impl JobArgs {
    fn into_config(self) -> Result<JobConfig> {
        let mut config = match &self.job {
            Some(path) => JobConfig::load(path)
                .with_context(|| format!("Failed to load job file {}", path.display()))?,
            None => JobConfig::default(),
        };

        if let Some(project) = self.project {
            config.project = project;
        }
        if let Some(version) = self.release_version {
            config.release_version = version;
        }
        if let Some(source) = self.notes_source {
            config.release_notes = true;
            config.release_notes_source = source;
        }
        if let Some(file) = self.notes_file {
            config.release_notes_file = file;
        }
        if let Some(environment) = self.environment {
            config.deploy_this_release = true;
            config.environment = environment;
        }
        if self.wait {
            config.wait_for_deployment = true;
        }
        config.package_configs.extend(self.packages);

        let config = config.normalized();
        if config.project.is_empty() {
            bail!("No project configured: pass --project or set `project` in the job file");
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    octorelease_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Release { build, job } => cmd_release(cli.settings.as_deref(), build, job).await,
        Commands::Validate {
            project,
            environment,
            release_version,
            notes_file,
        } => {
            cmd_validate(
                cli.settings.as_deref(),
                project.as_deref(),
                environment.as_deref(),
                release_version.as_deref(),
                notes_file.as_deref(),
            )
            .await
        }
        Commands::Metadata {
            build,
            comment_parser,
            output,
        } => cmd_metadata(&build, comment_parser.as_deref(), output.as_deref()),
    }
}

fn connect(settings_path: Option<&Path>) -> Result<(Arc<dyn DeploymentService>, Settings)> {
    let settings = Settings::load(settings_path).context("Failed to load settings")?;
    let client = OctopusClient::new(&settings.server).context("Failed to create Octopus client")?;
    debug!(host = %settings.server.host, "using Octopus server");
    let service: Arc<dyn DeploymentService> = Arc::new(client);
    Ok((service, settings))
}

fn load_history(path: Option<&Path>) -> Result<BuildChain> {
    match path {
        Some(path) => BuildChain::load(path)
            .with_context(|| format!("Failed to read build history {}", path.display())),
        None => Ok(BuildChain::default()),
    }
}

fn current_build(build: Option<u64>, history: &BuildChain) -> Result<BuildId> {
    build
        .map(BuildId)
        .or_else(|| history.last_build().map(|b| b.id))
        .context("Unknown build number: pass --build or set BUILD_NUMBER")
}

async fn cmd_release(settings_path: Option<&Path>, build: BuildArgs, job: JobArgs) -> Result<()> {
    let config = job.into_config()?;
    let (service, settings) = connect(settings_path)?;

    let history = load_history(build.history.as_deref())?;
    let current = current_build(build.build, &history)?;
    let variables = VariableResolver::from_env().with("BUILD_NUMBER", &current.0.to_string());
    let context = JobContext::new(build.workspace, variables, &history, current);

    let orchestrator = ReleaseOrchestrator::new(service, settings.deployment);
    let mut log = BuildLog::stdout();
    if !orchestrator.perform(&config, &context, &mut log).await {
        bail!("Release step failed for project '{}'", config.project);
    }
    Ok(())
}

async fn cmd_validate(
    settings_path: Option<&Path>,
    project: Option<&str>,
    environment: Option<&str>,
    release_version: Option<&str>,
    notes_file: Option<&str>,
) -> Result<()> {
    let (service, _) = connect(settings_path)?;
    let validation = ValidationService::new(service);

    let mut results: Vec<(&str, FormValidation)> = Vec::new();
    if let Some(project) = project {
        results.push(("project", validation.check_project(project).await));
    }
    if let Some(environment) = environment {
        results.push(("environment", validation.check_environment(environment).await));
    }
    if let Some(version) = release_version {
        let check = validation
            .check_release_version(version, project.unwrap_or_default())
            .await;
        results.push(("release version", check));
    }
    if let Some(file) = notes_file {
        results.push(("release notes file", validation.check_release_notes_file(file)));
    }

    for (field, result) in &results {
        println!("{field}: {result}");
    }
    let failed = results.iter().filter(|(_, r)| r.is_error()).count();
    if failed > 0 {
        bail!("{failed} field(s) failed validation");
    }
    Ok(())
}

fn cmd_metadata(build: &BuildArgs, comment_parser: Option<&str>, output: Option<&Path>) -> Result<()> {
    let history = load_history(build.history.as_deref())?;
    let current = current_build(build.build, &history)?;
    let metadata = PackageMetadata::for_build(&history, current)
        .with_git(&build.workspace)
        .with_comment_parser(comment_parser.unwrap_or_default());

    let json = serde_json::to_string_pretty(&metadata)?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
