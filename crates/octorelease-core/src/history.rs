//! Release notes aggregation over build history.
//!
//! Walks the successor links of a job's builds from the last successful
//! build up to (not including) the current build and collects the commit
//! messages recorded on every build in between, oldest first.

use tracing::{debug, warn};

use crate::domain::build::{BuildHistory, BuildId, BuildRecord, Commit};

/// Collects changes made since the last successful build.
pub struct ChangeHistoryWalker<'a> {
    history: &'a dyn BuildHistory,
}

impl<'a> ChangeHistoryWalker<'a> {
    pub fn new(history: &'a dyn BuildHistory) -> Self {
        Self { history }
    }

    /// Builds strictly between the last successful build and `current`.
    ///
    /// Starts at the successor of the last successful build, or at the first
    /// recorded build when nothing has succeeded yet. Stops at `current`,
    /// at the end of the recorded history, or at a link that does not move
    /// forward.
    pub fn pending_builds(&self, current: BuildId) -> Vec<&'a BuildRecord> {
        let history = self.history;
        let start = match history.last_successful_build() {
            Some(last) if last.id >= current => {
                debug!(last_success = %last.id, current = %current, "no builds since last success");
                return Vec::new();
            }
            Some(last) => history.next_build(last.id),
            None => history.first_build(),
        };

        let mut builds = Vec::new();
        let mut cursor = start;
        let mut reached_current = false;
        while let Some(build) = cursor {
            if build.id >= current {
                reached_current = true;
                break;
            }
            builds.push(build);
            cursor = match history.next_build(build.id) {
                Some(next) if next.id <= build.id => {
                    warn!(build = %build.id, next = %next.id, "build history link moves backwards; stopping");
                    None
                }
                next => next,
            };
        }

        if !reached_current && !builds.is_empty() {
            debug!(current = %current, "build history ended before the current build");
        }
        builds
    }

    /// Commits of every pending build, in chain order.
    pub fn commits_since_last_success(&self, current: BuildId) -> Vec<&'a Commit> {
        self.pending_builds(current)
            .into_iter()
            .flat_map(|build| build.change_set.iter())
            .collect()
    }

    /// Commit messages since the last successful build, one per line, each
    /// terminated by `\n`. Empty when there is nothing to report.
    pub fn release_notes(&self, current: BuildId) -> String {
        let mut notes = String::new();
        for commit in self.commits_since_last_success(current) {
            notes.push_str(&commit.message);
            notes.push('\n');
        }
        notes
    }
}
