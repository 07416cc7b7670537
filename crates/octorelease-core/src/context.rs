//! What the host CI server supplies for one job execution.

use std::path::{Path, PathBuf};

use crate::domain::build::{BuildHistory, BuildId};
use crate::substitute::VariableResolver;

/// Execution context of the running job.
pub struct JobContext<'a> {
    /// Workspace root; relative paths in the job configuration resolve here.
    pub workspace: PathBuf,
    pub variables: VariableResolver,
    pub history: &'a dyn BuildHistory,
    /// The build performing the release.
    pub current_build: BuildId,
}

impl<'a> JobContext<'a> {
    pub fn new(
        workspace: impl Into<PathBuf>,
        variables: VariableResolver,
        history: &'a dyn BuildHistory,
        current_build: BuildId,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            variables,
            history,
            current_build,
        }
    }

    pub fn workspace_path(&self, relative: &str) -> PathBuf {
        self.workspace.join(Path::new(relative))
    }

    pub fn substitute(&self, value: &str) -> String {
        self.variables.substitute(value)
    }
}
