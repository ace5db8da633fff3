//! gitpoll configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::WatcherConfig;

/// Environment variable naming the OpenShift master
pub const MASTER_ENV: &str = "KUBERNETES_MASTER";

/// Master endpoint used when neither config nor environment provide one
pub const FALLBACK_ENDPOINT: &str = "http://localhost:8080";

/// Default OpenShift master endpoint
///
/// Taken from `KUBERNETES_MASTER`, falling back to [`FALLBACK_ENDPOINT`].
pub fn default_endpoint() -> String {
    std::env::var(MASTER_ENV)
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ENDPOINT.to_string())
}

/// Main gitpoll configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenShift master: source of build configs and target of build hooks
    pub endpoint: String,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Polling intervals
    pub watcher: WatcherConfig,

    /// Git configuration
    pub git: GitConfig,

    /// Build hook delivery
    pub hook: HookConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            log_level: None,
            watcher: WatcherConfig::default(),
            git: GitConfig::default(),
            hook: HookConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .gitpoll.yml
        let local_config = PathBuf::from(".gitpoll.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/gitpoll/gitpoll.yml
        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => std::iter::once(PathBuf::from(".gitpoll.yml"))
                .chain(user_config_path())
                .collect(),
        };

        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gitpoll").join("gitpoll.yml"))
}

/// Git configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Base directory for repository clones (system temp dir when unset)
    #[serde(rename = "work-dir", skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Timeout for a single git command in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            timeout_secs: 300,
        }
    }
}

impl GitConfig {
    /// Per-command timeout; zero is raised to one second
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Build hook delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// User-Agent sent with each push event
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "GitHub-Hookshot/github".to_string(),
        }
    }
}

impl HookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
