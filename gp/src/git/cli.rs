//! `git` binary backed implementation of [`Git`]

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{Git, GitError};

/// Runs git as a child process, one process per operation
///
/// Every command is bounded by `timeout` and killed if the calling future
/// is dropped, so a stopped watcher never leaves git running.
#[derive(Debug, Clone)]
pub struct CliGit {
    timeout: Duration,
}

impl CliGit {
    pub fn new(timeout: Duration) -> Self {
        debug!(?timeout, "CliGit::new: called");
        Self { timeout }
    }

    fn command(&self, dir: Option<&Path>) -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn output(&self, mut cmd: Command, label: &str) -> Result<String, GitError> {
        debug!(%label, "CliGit::output: called");
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| GitError::Timeout {
                command: label.to_string(),
                timeout: self.timeout,
            })??;

        if !output.status.success() {
            debug!(%label, status = ?output.status, "CliGit::output: git failed");
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::Failed {
                command: label.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Refuse a repository or ref value that git would parse as an option
fn reject_option_like(command: &str, value: &str) -> Result<(), GitError> {
    if value.starts_with('-') {
        return Err(GitError::InvalidArgument {
            command: command.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl Git for CliGit {
    async fn clone_repo(&self, uri: &str, dest: &Path) -> Result<(), GitError> {
        debug!(%uri, ?dest, "CliGit::clone_repo: called");
        reject_option_like("clone", uri)?;
        let mut cmd = self.command(None);
        cmd.args(["clone", "--quiet", "--"]).arg(uri).arg(dest);
        self.output(cmd, "clone").await.map(|_| ())
    }

    async fn checkout(&self, dir: &Path, git_ref: &str) -> Result<(), GitError> {
        debug!(?dir, %git_ref, "CliGit::checkout: called");
        reject_option_like("checkout", git_ref)?;
        let mut cmd = self.command(Some(dir));
        cmd.args(["checkout", "--quiet", git_ref, "--"]);
        self.output(cmd, "checkout").await.map(|_| ())
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        debug!(?dir, ?args, "CliGit::run: called");
        let mut cmd = self.command(Some(dir));
        cmd.args(args);
        let label = args.first().copied().unwrap_or("");
        self.output(cmd, label).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{COMMIT_LOG_FORMAT, CommitRecord};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(["-c", "user.name=Ada", "-c", "user.email=ada@example.com"])
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .expect("Failed to run git");
        assert!(status.success(), "git {:?} failed", args);
    }

    fn origin_with_commit(message: &str) -> TempDir {
        let origin = TempDir::new().expect("Failed to create temp dir");
        git(origin.path(), &["init", "--quiet"]);
        std::fs::write(origin.path().join("README"), message).expect("Failed to write file");
        git(origin.path(), &["add", "README"]);
        git(origin.path(), &["commit", "--quiet", "-m", message]);
        origin
    }

    #[tokio::test]
    async fn test_clone_and_read_commit() {
        if !git_available() {
            return;
        }
        let origin = origin_with_commit("first commit");
        let work = TempDir::new().expect("Failed to create temp dir");
        let dest = work.path().join("clone");

        let cli = CliGit::new(Duration::from_secs(30));
        cli.clone_repo(origin.path().to_str().unwrap(), &dest).await.unwrap();

        let format = format!("--pretty={}", COMMIT_LOG_FORMAT);
        let output = cli.run(&dest, &["log", &format, "-n1"]).await.unwrap();
        let commit = CommitRecord::parse_log_line(&output).unwrap();

        assert_eq!(commit.sha.len(), 40);
        assert_eq!(commit.author.name, "Ada");
        assert_eq!(commit.committer.email, "ada@example.com");
        assert_eq!(commit.message, "first commit");
    }

    #[tokio::test]
    async fn test_pull_sees_new_commit() {
        if !git_available() {
            return;
        }
        let origin = origin_with_commit("first");
        let work = TempDir::new().expect("Failed to create temp dir");
        let dest = work.path().join("clone");

        let cli = CliGit::new(Duration::from_secs(30));
        cli.clone_repo(origin.path().to_str().unwrap(), &dest).await.unwrap();
        let before = cli.run(&dest, &["rev-parse", "HEAD"]).await.unwrap();

        std::fs::write(origin.path().join("README"), "second").unwrap();
        git(origin.path(), &["commit", "--quiet", "-am", "second"]);

        cli.run(&dest, &["pull"]).await.unwrap();
        let after = cli.run(&dest, &["rev-parse", "HEAD"]).await.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_clone_missing_repository_fails() {
        if !git_available() {
            return;
        }
        let work = TempDir::new().expect("Failed to create temp dir");
        let missing = PathBuf::from(work.path()).join("does-not-exist");

        let cli = CliGit::new(Duration::from_secs(30));
        let result = cli.clone_repo(missing.to_str().unwrap(), &work.path().join("clone")).await;

        assert!(matches!(result, Err(GitError::Failed { ref command, .. }) if command == "clone"));
    }

    #[tokio::test]
    async fn test_checkout_unknown_ref_fails() {
        if !git_available() {
            return;
        }
        let origin = origin_with_commit("first");
        let cli = CliGit::new(Duration::from_secs(30));

        let result = cli.checkout(origin.path(), "no-such-branch").await;
        assert!(matches!(result, Err(GitError::Failed { .. })));
    }

    #[tokio::test]
    async fn test_option_like_ref_is_rejected() {
        let work = TempDir::new().expect("Failed to create temp dir");
        let cli = CliGit::new(Duration::from_secs(30));

        let result = cli.checkout(work.path(), "--orphan=x").await;
        assert!(matches!(
            result,
            Err(GitError::InvalidArgument { ref command, ref value }) if command == "checkout" && value == "--orphan=x"
        ));
    }

    #[tokio::test]
    async fn test_option_like_uri_is_rejected() {
        let work = TempDir::new().expect("Failed to create temp dir");
        let cli = CliGit::new(Duration::from_secs(30));

        let result = cli
            .clone_repo("--upload-pack=touch pwned", &work.path().join("clone"))
            .await;
        assert!(matches!(result, Err(GitError::InvalidArgument { ref command, .. }) if command == "clone"));
        assert!(!work.path().join("clone").exists());
    }

    #[tokio::test]
    async fn test_checkout_existing_branch() {
        if !git_available() {
            return;
        }
        let origin = origin_with_commit("first");
        git(origin.path(), &["branch", "dev"]);
        let cli = CliGit::new(Duration::from_secs(30));

        cli.checkout(origin.path(), "dev").await.unwrap();
        let head = cli.run(origin.path(), &["rev-parse", "--abbrev-ref", "HEAD"]).await.unwrap();
        assert_eq!(head.trim(), "dev");
    }
}
