//! Git operations used by the repository watcher
//!
//! The watcher only needs clone, checkout and a generic command runner
//! (for `pull` and `log`). [`CliGit`] implements them by shelling out to
//! the `git` binary.

mod cli;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use cli::CliGit;

/// Error types for git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("git {command} refused option-like argument {value:?}")]
    InvalidArgument { command: String, value: String },

    #[error("git {command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Narrow git contract the watchers depend on
#[async_trait]
pub trait Git: Send + Sync {
    /// Clone `uri` into `dest`, which must be empty or absent
    async fn clone_repo(&self, uri: &str, dest: &Path) -> Result<(), GitError>;

    /// Check out `git_ref` inside the clone at `dir`
    async fn checkout(&self, dir: &Path, git_ref: &str) -> Result<(), GitError>;

    /// Run `git <args>` inside `dir` and return its stdout
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError>;
}
