//! Build information document attached to pushed packages.
//!
//! Serialized with the server's PascalCase keys.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::build::{BuildHistory, BuildId};
use crate::git;
use crate::history::ChangeHistoryWalker;

const BUILD_ENVIRONMENT: &str = "Jenkins";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataCommit {
    pub id: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageMetadata {
    pub build_environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_parser: Option<String>,
    pub build_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_commit_number: Option<String>,
    pub commits: Vec<MetadataCommit>,
}

impl PackageMetadata {
    pub fn new(build_number: BuildId) -> Self {
        PackageMetadata {
            build_environment: BUILD_ENVIRONMENT.to_string(),
            comment_parser: None,
            build_number: build_number.0.to_string(),
            build_url: None,
            vcs_type: None,
            vcs_root: None,
            vcs_commit_number: None,
            commits: Vec::new(),
        }
    }

    /// Metadata for `current`: its URL from the history and the commits of
    /// every build since the last successful one.
    pub fn for_build(history: &dyn BuildHistory, current: BuildId) -> Self {
        let mut metadata = PackageMetadata::new(current);
        metadata.build_url = history.build(current).and_then(|b| b.url.clone());
        metadata.commits = ChangeHistoryWalker::new(history)
            .commits_since_last_success(current)
            .into_iter()
            .map(|c| MetadataCommit {
                id: c.id.clone(),
                comment: c.message.clone(),
            })
            .collect();
        metadata
    }

    /// Fill the VCS fields from the git repository at `workspace`.
    ///
    /// Leaves them unset when the workspace is not a git work tree.
    pub fn with_git(mut self, workspace: &Path) -> Self {
        if !git::is_git_repo(workspace) {
            debug!(workspace = %workspace.display(), "workspace is not a git repository");
            return self;
        }
        self.vcs_type = Some("Git".to_string());
        self.vcs_commit_number = git::capture_head_sha(workspace).ok();
        self.vcs_root = git::origin_url(workspace).ok();
        self
    }

    pub fn with_comment_parser(mut self, parser: &str) -> Self {
        let parser = parser.trim();
        self.comment_parser = (!parser.is_empty()).then(|| parser.to_string());
        self
    }
}
