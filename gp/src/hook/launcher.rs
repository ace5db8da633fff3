//! Per-configuration commit listener

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{info, warn};

use super::dispatcher::Notifier;
use crate::domain::{BuildConfig, CommitRecord};
use crate::watcher::CommitListener;

/// Build configuration shared between a launcher and its owner
pub type SharedConfig = Arc<RwLock<BuildConfig>>;

/// Binds a repository watcher to the build configuration that asked for it
///
/// The configuration is read at each commit, so a rotated secret takes
/// effect without restarting the watcher. Delivery failures are logged and
/// dropped.
pub struct BuildLauncher {
    config: SharedConfig,
    notifier: Arc<dyn Notifier>,
}

impl BuildLauncher {
    pub fn new(config: BuildConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_shared(Arc::new(RwLock::new(config)), notifier)
    }

    /// Create a launcher reading an externally updated configuration
    pub fn with_shared(config: SharedConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    /// Current configuration
    pub fn config(&self) -> BuildConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CommitListener for BuildLauncher {
    async fn commit_available(&self, commit: &CommitRecord) {
        let config = self.config();
        info!(
            id = %config.id,
            sha = %commit.short_sha(),
            author = %commit.author.name,
            message = %commit.message,
            "A commit is available"
        );

        if let Err(e) = self.notifier.notify(&config, commit).await {
            warn!(id = %config.id, sha = %commit.short_sha(), error = %e, "Build hook delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CommitUser;
    use crate::hook::DispatchError;
    use crate::test_support::RecordingNotifier;

    /// Records the secret each notification was addressed with
    #[derive(Default)]
    struct SecretRecorder {
        secrets: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for SecretRecorder {
        async fn notify(&self, config: &BuildConfig, _commit: &CommitRecord) -> Result<(), DispatchError> {
            self.secrets.lock().unwrap().push(config.secret.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _config: &BuildConfig, _commit: &CommitRecord) -> Result<(), DispatchError> {
            Err(DispatchError::Status {
                status: 500,
                message: "boom".to_string(),
            })
        }
    }

    fn commit(sha: &str) -> CommitRecord {
        CommitRecord {
            sha: sha.to_string(),
            message: "m".to_string(),
            author: CommitUser::new("n", "e"),
            committer: CommitUser::new("n", "e"),
        }
    }

    #[tokio::test]
    async fn test_forwards_commit_with_owning_config() {
        let notifier = Arc::new(RecordingNotifier::default());
        let launcher = BuildLauncher::new(BuildConfig::new("a", "repo-a", "s"), notifier.clone());

        launcher.commit_available(&commit("c1")).await;
        launcher.commit_available(&commit("c2")).await;

        assert_eq!(
            notifier.sent(),
            vec![("a".to_string(), "c1".to_string()), ("a".to_string(), "c2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let launcher = BuildLauncher::new(BuildConfig::new("a", "repo-a", "s"), Arc::new(FailingNotifier));
        launcher.commit_available(&commit("c1")).await;
    }

    #[tokio::test]
    async fn test_updated_shared_config_is_used_for_later_commits() {
        let notifier = Arc::new(SecretRecorder::default());
        let shared: SharedConfig = Arc::new(RwLock::new(BuildConfig::new("a", "repo-a", "s1")));
        let launcher = BuildLauncher::with_shared(shared.clone(), notifier.clone());

        launcher.commit_available(&commit("c1")).await;
        shared.write().unwrap().secret = "s2".to_string();
        launcher.commit_available(&commit("c2")).await;

        assert_eq!(*notifier.secrets.lock().unwrap(), vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(launcher.config().secret, "s2");
    }
}
