//! Watcher configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling intervals for both watcher kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Seconds between build configuration polls
    #[serde(rename = "build-config-interval-secs", default = "default_interval_secs")]
    pub build_config_interval_secs: u64,

    /// Seconds between polls of each watched repository
    #[serde(rename = "repository-interval-secs", default = "default_interval_secs")]
    pub repository_interval_secs: u64,

    /// Request timeout for the build configuration list
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

/// Shortest period a watcher will tick at; `tokio::time::interval` rejects zero
pub(crate) const MIN_TICK: Duration = Duration::from_millis(1);

fn default_interval_secs() -> u64 {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            build_config_interval_secs: default_interval_secs(),
            repository_interval_secs: default_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl WatcherConfig {
    /// Build configuration poll interval as a Duration
    pub fn build_config_interval(&self) -> Duration {
        Duration::from_secs(self.build_config_interval_secs.max(1))
    }

    /// Repository poll interval as a Duration
    pub fn repository_interval(&self) -> Duration {
        Duration::from_secs(self.repository_interval_secs.max(1))
    }

    /// Collection fetch timeout; zero is raised to one second
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}
