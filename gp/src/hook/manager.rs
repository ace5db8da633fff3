//! HookManager - keeps one repository watcher per build configuration
//!
//! The HookManager is responsible for:
//! - Starting a repository watcher when a build config appears
//! - Stopping it when the build config disappears
//! - Applying changes to a build config that stays
//! - Owning the registry of running watchers
//! - Stopping every watcher on shutdown

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::Notifier;
use super::launcher::{BuildLauncher, SharedConfig};
use crate::domain::BuildConfig;
use crate::git::Git;
use crate::watcher::{CollectionListener, MIN_TICK, RepositoryWatcher, WatcherHandle};

/// A running watcher and the configuration its launcher reads
struct Watched {
    handle: WatcherHandle,
    config: SharedConfig,
}

impl Watched {
    fn current(&self) -> BuildConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Lifecycle manager for repository watchers
///
/// Mutated only through [`CollectionListener`] callbacks, which the
/// collection watcher issues one at a time from its own task.
pub struct HookManager {
    git: Arc<dyn Git>,
    notifier: Arc<dyn Notifier>,
    repository_interval: Duration,
    work_root: Option<PathBuf>,
    token: CancellationToken,
    watchers: HashMap<String, Watched>,
}

impl HookManager {
    /// Create a manager; every watcher it starts is cancelled with `token`
    pub fn new(
        git: Arc<dyn Git>,
        notifier: Arc<dyn Notifier>,
        repository_interval: Duration,
        token: CancellationToken,
    ) -> Self {
        debug!(?repository_interval, "HookManager::new: called");
        Self {
            git,
            notifier,
            repository_interval: repository_interval.max(MIN_TICK),
            work_root: None,
            token,
            watchers: HashMap::new(),
        }
    }

    /// Place repository clones under `root`
    pub fn with_work_root(mut self, root: Option<PathBuf>) -> Self {
        self.work_root = root;
        self
    }

    /// Get the number of running watchers
    pub fn active_count(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_watching(&self, id: &str) -> bool {
        self.watchers.contains_key(id)
    }

    /// Get IDs of all watched build configs
    pub fn watched_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.watchers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Configuration the watcher for `id` currently reports with
    pub fn watched_config(&self, id: &str) -> Option<BuildConfig> {
        self.watchers.get(id).map(Watched::current)
    }

    /// Start a watcher for `config`, stopping any previous one for its id
    fn start_watcher(&mut self, config: BuildConfig) {
        if let Some(previous) = self.watchers.remove(&config.id) {
            previous.handle.stop();
        }

        let shared: SharedConfig = Arc::new(RwLock::new(config.clone()));
        let watcher = RepositoryWatcher::new(
            config.uri.clone(),
            config.checkout_ref(),
            self.git.clone(),
            Arc::new(BuildLauncher::with_shared(shared.clone(), self.notifier.clone())),
            self.repository_interval,
        )
        .with_work_root(self.work_root.clone());

        let handle = watcher.spawn(self.token.child_token());
        info!(id = %config.id, uri = %config.uri, branch = %config.branch(), "Watching repository");
        self.watchers.insert(config.id, Watched { handle, config: shared });
    }
}

#[async_trait]
impl CollectionListener for HookManager {
    async fn item_added(&mut self, config: BuildConfig) {
        debug!(id = %config.id, "HookManager::item_added: called");
        if self.watchers.contains_key(&config.id) {
            warn!(id = %config.id, "Build config already watched, replacing its watcher");
        }
        self.start_watcher(config);
    }

    /// A new repository or ref needs a fresh clone; anything else (such as
    /// a rotated secret) is applied to the running watcher in place
    async fn item_changed(&mut self, config: BuildConfig) {
        debug!(id = %config.id, "HookManager::item_changed: called");
        let Some(watched) = self.watchers.get(&config.id) else {
            self.start_watcher(config);
            return;
        };

        let current = watched.current();
        if current.uri != config.uri || current.checkout_ref() != config.checkout_ref() {
            info!(id = %config.id, old_uri = %current.uri, new_uri = %config.uri, "Build config source changed, restarting watcher");
            self.start_watcher(config);
        } else {
            info!(id = %config.id, "Build config updated in place");
            *watched.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        }
    }

    async fn item_removed(&mut self, id: &str) {
        debug!(%id, "HookManager::item_removed: called");
        match self.watchers.remove(id) {
            Some(watched) => {
                watched.handle.stop();
                info!(%id, "Stopped watching repository");
            }
            None => debug!(%id, "HookManager::item_removed: no watcher registered"),
        }
    }

    async fn shutdown(&mut self) {
        info!("Shutting down HookManager with {} active watchers", self.watchers.len());
        for (id, watched) in self.watchers.drain() {
            debug!(%id, "HookManager::shutdown: stopping watcher");
            watched.handle.stop_and_wait().await;
        }
        info!("HookManager shutdown complete");
    }
}
