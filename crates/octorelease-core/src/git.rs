//! Workspace version-control state, read through the system `git`.

use std::path::Path;
use std::process::Command;

use crate::domain::error::{RecorderError, Result};

fn git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| RecorderError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RecorderError::GitError(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        return Err(RecorderError::GitError(format!(
            "git {} returned empty output",
            args.join(" ")
        )));
    }
    Ok(value)
}

/// HEAD commit SHA of the repository containing `repo_dir`.
pub fn capture_head_sha(repo_dir: &Path) -> Result<String> {
    git(repo_dir, &["rev-parse", "HEAD"])
}

/// URL of the `origin` remote.
pub fn origin_url(repo_dir: &Path) -> Result<String> {
    git(repo_dir, &["remote", "get-url", "origin"])
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
