//! Per-repository commit watcher
//!
//! Each watcher owns a private clone. The first successful commit read is
//! always reported; afterwards only a changed head hash is reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{COMMIT_LOG_FORMAT, CommitParseError, CommitRecord};
use super::config::MIN_TICK;
use crate::git::{Git, GitError};

/// Prefix of the temporary directories holding clones
const WORK_DIR_PREFIX: &str = "watchrepo";

/// Receives newly observed head commits
#[async_trait]
pub trait CommitListener: Send + Sync {
    async fn commit_available(&self, commit: &CommitRecord);
}

/// Errors reading the head commit
#[derive(Debug, Error)]
pub enum CommitReadError {
    #[error("git log failed: {0}")]
    Command(#[from] GitError),

    #[error(transparent)]
    Malformed(#[from] CommitParseError),
}

/// Errors ending a single tick
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Could not create local directory: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("Could not clone {uri}: {source}")]
    Clone { uri: String, source: GitError },

    #[error("Could not checkout ref {git_ref}: {source}")]
    Checkout { git_ref: String, source: GitError },

    #[error("git pull failed: {0}")]
    Pull(#[source] GitError),

    #[error("Could not retrieve commit details: {0}")]
    CommitRead(#[from] CommitReadError),
}

/// What a successful tick observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// First clone and commit read; always reported
    Initialized { sha: String },
    /// Head moved; reported
    Updated { old_sha: String, new_sha: String },
    /// Head unchanged; nothing reported
    Unchanged,
}

enum WatchState {
    Uninitialized,
    Tracking { work_dir: TempDir, last_sha: String },
}

/// Watches one repository at one ref
pub struct RepositoryWatcher {
    uri: String,
    git_ref: Option<String>,
    git: Arc<dyn Git>,
    listener: Arc<dyn CommitListener>,
    work_root: Option<PathBuf>,
    interval: Duration,
    state: WatchState,
}

impl RepositoryWatcher {
    pub fn new(
        uri: impl Into<String>,
        git_ref: Option<&str>,
        git: Arc<dyn Git>,
        listener: Arc<dyn CommitListener>,
        interval: Duration,
    ) -> Self {
        let uri = uri.into();
        debug!(%uri, ?git_ref, ?interval, "RepositoryWatcher::new: called");
        Self {
            uri,
            git_ref: git_ref.filter(|r| !r.is_empty()).map(str::to_string),
            git,
            listener,
            work_root: None,
            interval: interval.max(MIN_TICK),
            state: WatchState::Uninitialized,
        }
    }

    /// Create clones under `root` instead of the system temp directory
    pub fn with_work_root(mut self, root: Option<PathBuf>) -> Self {
        self.work_root = root;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, WatchState::Tracking { .. })
    }

    pub fn last_known_sha(&self) -> Option<&str> {
        match &self.state {
            WatchState::Tracking { last_sha, .. } => Some(last_sha),
            WatchState::Uninitialized => None,
        }
    }

    /// Local clone, once one has been adopted
    pub fn work_dir(&self) -> Option<&Path> {
        match &self.state {
            WatchState::Tracking { work_dir, .. } => Some(work_dir.path()),
            WatchState::Uninitialized => None,
        }
    }

    /// Run one unit of work
    ///
    /// Errors leave the watcher in its previous state; the next tick retries.
    pub async fn tick(&mut self) -> Result<TickOutcome, RepositoryError> {
        debug!(uri = %self.uri, tracking = self.is_tracking(), "RepositoryWatcher::tick: called");
        if self.is_tracking() {
            self.check_for_updates().await
        } else {
            self.initialize().await
        }
    }

    async fn initialize(&mut self) -> Result<TickOutcome, RepositoryError> {
        info!(uri = %self.uri, "Initializing repository");

        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix(WORK_DIR_PREFIX);
            builder
        };
        let work_dir = match &self.work_root {
            Some(root) => {
                tokio::fs::create_dir_all(root).await.map_err(RepositoryError::WorkDir)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(RepositoryError::WorkDir)?;

        self.git
            .clone_repo(&self.uri, work_dir.path())
            .await
            .map_err(|source| RepositoryError::Clone {
                uri: self.uri.clone(),
                source,
            })?;

        if let Some(git_ref) = &self.git_ref {
            self.git
                .checkout(work_dir.path(), git_ref)
                .await
                .map_err(|source| RepositoryError::Checkout {
                    git_ref: git_ref.clone(),
                    source,
                })?;
        }

        // A failed read discards this clone; the next tick clones again.
        let commit = self.read_commit(work_dir.path()).await?;

        info!(uri = %self.uri, sha = %commit.short_sha(), "Repository initialized");
        self.state = WatchState::Tracking {
            work_dir,
            last_sha: commit.sha.clone(),
        };
        self.listener.commit_available(&commit).await;

        Ok(TickOutcome::Initialized { sha: commit.sha })
    }

    async fn check_for_updates(&mut self) -> Result<TickOutcome, RepositoryError> {
        let (Some(dir), Some(last_sha)) = (
            self.work_dir().map(Path::to_path_buf),
            self.last_known_sha().map(str::to_string),
        ) else {
            return self.initialize().await;
        };

        self.git.run(&dir, &["pull"]).await.map_err(RepositoryError::Pull)?;

        let commit = self.read_commit(&dir).await?;
        if commit.sha == last_sha {
            debug!(uri = %self.uri, sha = %commit.short_sha(), "Repository unchanged");
            return Ok(TickOutcome::Unchanged);
        }

        info!(uri = %self.uri, old_sha = %last_sha, new_sha = %commit.sha, "Repository updated");
        if let WatchState::Tracking { last_sha: known, .. } = &mut self.state {
            *known = commit.sha.clone();
        }
        self.listener.commit_available(&commit).await;

        Ok(TickOutcome::Updated {
            old_sha: last_sha,
            new_sha: commit.sha,
        })
    }

    async fn read_commit(&self, dir: &Path) -> Result<CommitRecord, CommitReadError> {
        let format = format!("--pretty={}", COMMIT_LOG_FORMAT);
        let output = self.git.run(dir, &["log", &format, "-n1"]).await?;
        Ok(CommitRecord::parse_log_line(&output)?)
    }

    /// Tick on the configured interval until `token` is cancelled
    ///
    /// Cancellation is checked before every tick and raced against the
    /// tick itself, so an in-flight git command is abandoned (and killed).
    pub async fn run(mut self, token: CancellationToken) {
        let uri = self.uri.clone();
        info!(%uri, interval_secs = self.interval.as_secs(), "Repository watcher started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(%uri, "Tick abandoned on stop");
                    break;
                }
                result = self.tick() => match result {
                    Ok(outcome) => debug!(%uri, ?outcome, "Tick complete"),
                    Err(e) => warn!(%uri, error = %e, "Unable to check repository for updates"),
                }
            }
        }

        info!(%uri, "Repository watcher stopped");
    }

    /// Run on a new tokio task bound to `token`
    pub fn spawn(self, token: CancellationToken) -> WatcherHandle {
        let task = tokio::spawn(self.run(token.clone()));
        WatcherHandle { token, task }
    }
}

/// Controller for a spawned [`RepositoryWatcher`]
///
/// Dropping the handle stops the watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Ask the watcher to stop; it performs no further ticks
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the watcher and wait for its task to exit
    pub async fn stop_and_wait(mut self) {
        self.stop();
        if let Err(e) = (&mut self.task).await {
            error!(error = %e, "Repository watcher task panicked");
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
