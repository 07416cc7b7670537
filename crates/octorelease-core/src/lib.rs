//! Octorelease Core Library
//!
//! Release recording for CI build steps: collect release notes, create a
//! release on an Octopus Deploy server, optionally deploy it, and validate
//! step configuration interactively.

pub mod build_log;
pub mod config;
pub mod context;
pub mod domain;
pub mod git;
pub mod history;
pub mod notes;
pub mod obs;
pub mod orchestrator;
pub mod package_metadata;
pub mod substitute;
pub mod telemetry;
pub mod validation;

pub use build_log::{BuildLog, LogCapture};
pub use config::{JobConfig, Settings, WaitSettings};
pub use context::JobContext;
pub use domain::{
    BuildChain, BuildHistory, BuildId, BuildRecord, BuildResult, Commit, ErrorKind,
    PackageConfiguration, PackageSelection, PackageSelectionSet, RecorderError, Result,
};
pub use git::{capture_head_sha, is_git_repo, origin_url};
pub use history::ChangeHistoryWalker;
pub use notes::{ReleaseNotesProvider, ReleaseNotesSource};
pub use orchestrator::{ReleaseOrchestrator, ReleaseReport};
pub use package_metadata::{MetadataCommit, PackageMetadata};
pub use substitute::VariableResolver;
pub use telemetry::init_tracing;
pub use validation::{FormValidation, ValidationService};

/// Octorelease version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
