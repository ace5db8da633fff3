//! Build configuration collection watcher

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::MIN_TICK;
use super::snapshot::SnapshotStore;
use crate::domain::BuildConfig;
use crate::source::{BuildConfigSource, SourceError};

/// Receives collection transitions, one call per identity per transition
///
/// Callbacks run on the watcher's own task, one at a time.
#[async_trait]
pub trait CollectionListener: Send {
    /// A configuration appeared since the previous poll
    async fn item_added(&mut self, config: BuildConfig);

    /// A configuration disappeared since the previous poll
    async fn item_removed(&mut self, id: &str);

    /// A configuration kept its id but its contents changed
    async fn item_changed(&mut self, _config: BuildConfig) {}

    /// The watcher is exiting
    async fn shutdown(&mut self) {}
}

/// Identities changed by one sync
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub total: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Polls a [`BuildConfigSource`] and diffs each result against the snapshot
pub struct CollectionWatcher<L> {
    source: Arc<dyn BuildConfigSource>,
    listener: L,
    snapshot: SnapshotStore,
    interval: Duration,
}

impl<L: CollectionListener> CollectionWatcher<L> {
    pub fn new(source: Arc<dyn BuildConfigSource>, listener: L, interval: Duration) -> Self {
        debug!(?interval, "CollectionWatcher::new: called");
        Self {
            source,
            listener,
            snapshot: SnapshotStore::new(),
            interval: interval.max(MIN_TICK),
        }
    }

    /// Use an existing (possibly shared) snapshot store
    pub fn with_snapshot(mut self, snapshot: SnapshotStore) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Fetch the collection once and apply the difference
    ///
    /// On fetch failure nothing is applied. Every retained item replaces its
    /// stored copy. Each snapshot change happens before the matching
    /// listener call.
    pub async fn sync(&mut self) -> Result<SyncReport, SourceError> {
        debug!("CollectionWatcher::sync: called");
        let configs = self.source.list().await?;

        let mut seen = HashSet::with_capacity(configs.len());
        let mut current = Vec::with_capacity(configs.len());
        for config in configs {
            if seen.insert(config.id.clone()) {
                current.push(config);
            } else {
                warn!(id = %config.id, "Duplicate build config id in one poll, keeping the first");
            }
        }

        let previous = self.snapshot.ids();
        let mut removed: Vec<String> = previous.difference(&seen).cloned().collect();
        removed.sort();
        let (retained, added): (Vec<BuildConfig>, Vec<BuildConfig>) =
            current.into_iter().partition(|c| previous.contains(&c.id));

        let mut report = SyncReport {
            total: seen.len(),
            ..Default::default()
        };

        for config in added {
            info!(id = %config.id, uri = %config.uri, "Build config added");
            report.added.push(config.id.clone());
            self.snapshot.insert(config.clone());
            self.listener.item_added(config).await;
        }

        for config in retained {
            if self.snapshot.get(&config.id).as_ref() == Some(&config) {
                continue;
            }
            info!(id = %config.id, uri = %config.uri, "Build config changed");
            report.changed.push(config.id.clone());
            self.snapshot.insert(config.clone());
            self.listener.item_changed(config).await;
        }

        for id in removed {
            info!(%id, "Build config deleted");
            self.snapshot.remove(&id);
            self.listener.item_removed(&id).await;
            report.removed.push(id);
        }

        debug!(?report, "CollectionWatcher::sync: done");
        Ok(report)
    }

    /// Poll until `token` is cancelled, then shut the listener down
    pub async fn run(mut self, token: CancellationToken) -> Self {
        info!(interval_secs = self.interval.as_secs(), "Build config watcher started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            // A slow fetch must not hold up shutdown
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = self.sync() => match result {
                    Ok(report) if !report.is_empty() => {
                        debug!(
                            added = report.added.len(),
                            changed = report.changed.len(),
                            removed = report.removed.len(),
                            "Sync applied changes"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "An error occurred during sync");
                    }
                }
            }
        }

        info!("Build config watcher stopping");
        self.listener.shutdown().await;
        self
    }
}

impl<L: CollectionListener + 'static> CollectionWatcher<L> {
    /// Run on a new tokio task; the task yields the watcher back once stopped
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<Self> {
        tokio::spawn(self.run(token))
    }
}
