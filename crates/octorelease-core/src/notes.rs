//! Release notes resolution.
//!
//! Notes come either from a file in the workspace or from the commit
//! messages recorded on builds since the last successful one. An unreadable
//! notes file fails the release; placeholder text is never sent as notes.

use std::str::FromStr;

use tracing::debug;

use crate::context::JobContext;
use crate::domain::error::{RecorderError, Result};
use crate::history::ChangeHistoryWalker;

/// Where release notes are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseNotesSource {
    /// A workspace-relative file.
    File,
    /// Commit messages since the last successful build.
    Scm,
}

impl FromStr for ReleaseNotesSource {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(ReleaseNotesSource::File),
            "scm" => Ok(ReleaseNotesSource::Scm),
            other => Err(RecorderError::Configuration(format!(
                "if using release notes, should have source of file or scm. Found '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ReleaseNotesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseNotesSource::File => f.write_str("file"),
            ReleaseNotesSource::Scm => f.write_str("scm"),
        }
    }
}

/// Resolves release notes for the running job.
pub struct ReleaseNotesProvider<'c, 'a> {
    context: &'c JobContext<'a>,
}

impl<'c, 'a> ReleaseNotesProvider<'c, 'a> {
    pub fn new(context: &'c JobContext<'a>) -> Self {
        Self { context }
    }

    /// Resolve notes from the configured `source`.
    ///
    /// `notes_file` is only consulted for [`ReleaseNotesSource::File`] and is
    /// expected to be substituted already.
    pub fn resolve(&self, source: &str, notes_file: &str) -> Result<String> {
        match source.parse::<ReleaseNotesSource>()? {
            ReleaseNotesSource::File => self.from_file(notes_file),
            ReleaseNotesSource::Scm => Ok(self.from_history()),
        }
    }

    /// Full text of the notes file, lines joined with `\n`.
    pub fn from_file(&self, notes_file: &str) -> Result<String> {
        let path = self.context.workspace_path(notes_file);
        let content =
            std::fs::read_to_string(&path).map_err(|source| RecorderError::ReleaseNotesFile {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = content.len(), "read release notes file");
        Ok(content.lines().collect::<Vec<_>>().join("\n"))
    }

    pub fn from_history(&self) -> String {
        ChangeHistoryWalker::new(self.context.history).release_notes(self.context.current_build)
    }
}
