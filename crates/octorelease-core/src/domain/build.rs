//! Build history as supplied by the host CI server.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;

/// Build number; increases monotonically within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub u64);

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
    #[default]
    InProgress,
}

/// A version-control change recorded against a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// One historical execution of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub id: BuildId,
    #[serde(default)]
    pub result: BuildResult,
    /// Changes picked up by this build, in version-control order.
    #[serde(default)]
    pub change_set: Vec<Commit>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
}

impl BuildRecord {
    pub fn new(id: u64, result: BuildResult) -> Self {
        Self {
            id: BuildId(id),
            result,
            change_set: Vec::new(),
            started_at: None,
            url: None,
        }
    }

    /// Append a commit to the change set.
    pub fn with_commit(mut self, id: &str, message: &str) -> Self {
        self.change_set.push(Commit {
            id: id.to_string(),
            message: message.to_string(),
            author: None,
        });
        self
    }
}

/// Read-only view of a job's build history.
pub trait BuildHistory {
    /// Oldest recorded build.
    fn first_build(&self) -> Option<&BuildRecord>;

    /// Most recent build whose result is `Success`.
    fn last_successful_build(&self) -> Option<&BuildRecord>;

    fn build(&self, id: BuildId) -> Option<&BuildRecord>;

    /// The chronologically-next build after `id`, if any.
    fn next_build(&self, id: BuildId) -> Option<&BuildRecord>;
}

/// In-memory build history, ordered by build number.
///
/// Hosts export this as JSON (`{"builds": [...]}`) for the CLI to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildChain {
    #[serde(default)]
    builds: Vec<BuildRecord>,
}

impl BuildChain {
    pub fn new(builds: Vec<BuildRecord>) -> Self {
        let mut chain = Self { builds };
        chain.normalize();
        chain
    }

    /// Load a chain from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut chain: BuildChain = serde_json::from_str(&content)?;
        chain.normalize();
        Ok(chain)
    }

    /// Insert or replace a build, keeping the chain ordered.
    pub fn push(&mut self, build: BuildRecord) {
        self.builds.retain(|b| b.id != build.id);
        self.builds.push(build);
        self.normalize();
    }

    pub fn builds(&self) -> &[BuildRecord] {
        &self.builds
    }

    pub fn last_build(&self) -> Option<&BuildRecord> {
        self.builds.last()
    }

    fn normalize(&mut self) {
        self.builds.sort_by_key(|b| b.id);
        self.builds.dedup_by_key(|b| b.id);
    }

    fn position(&self, id: BuildId) -> Option<usize> {
        self.builds.binary_search_by_key(&id, |b| b.id).ok()
    }
}

impl BuildHistory for BuildChain {
    fn first_build(&self) -> Option<&BuildRecord> {
        self.builds.first()
    }

    fn last_successful_build(&self) -> Option<&BuildRecord> {
        self.builds
            .iter()
            .rev()
            .find(|b| b.result == BuildResult::Success)
    }

    fn build(&self, id: BuildId) -> Option<&BuildRecord> {
        self.position(id).map(|i| &self.builds[i])
    }

    fn next_build(&self, id: BuildId) -> Option<&BuildRecord> {
        match self.builds.binary_search_by_key(&id, |b| b.id) {
            Ok(i) => self.builds.get(i + 1),
            // Unknown id: the next build is the first one recorded after it.
            Err(i) => self.builds.get(i),
        }
    }
}
