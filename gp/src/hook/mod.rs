//! Build hook triggering
//!
//! Ties the watchers together: the [`HookManager`] reacts to build config
//! additions and removals by starting and stopping repository watchers,
//! and each watcher hands new commits to a [`BuildLauncher`], which posts
//! them to the build hook through a [`Notifier`].

mod dispatcher;
mod launcher;
mod manager;
mod payload;

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::git::CliGit;
use crate::source::{HttpBuildConfigSource, SourceError};
use crate::watcher::CollectionWatcher;

pub use dispatcher::{DispatchError, EVENT_HEADER, HOOK_PATH, HOOK_PROVIDER, Notifier, WebhookDispatcher, webhook_url};
pub use launcher::{BuildLauncher, SharedConfig};
pub use manager::HookManager;
pub use payload::{HeadCommit, PushEvent};

/// Errors building the polling pipeline
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Could not create build config client: {0}")]
    Source(#[from] SourceError),

    #[error("Could not create build hook client: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Start polling the master described by `config`
///
/// Runs until `token` is cancelled. The returned task finishes once every
/// repository watcher has stopped.
pub fn start(config: &Config, token: CancellationToken) -> Result<JoinHandle<CollectionWatcher<HookManager>>, StartError> {
    info!(
        endpoint = %config.endpoint,
        build_config_interval_secs = config.watcher.build_config_interval().as_secs(),
        repository_interval_secs = config.watcher.repository_interval().as_secs(),
        "Starting gitpoll"
    );

    let source = HttpBuildConfigSource::new(&config.endpoint, config.watcher.fetch_timeout())?;
    let notifier = WebhookDispatcher::new(&config.endpoint, &config.hook)?;
    let git = CliGit::new(config.git.timeout());

    let manager = HookManager::new(
        Arc::new(git),
        Arc::new(notifier),
        config.watcher.repository_interval(),
        token.child_token(),
    )
    .with_work_root(config.git.work_dir.clone());

    let watcher = CollectionWatcher::new(Arc::new(source), manager, config.watcher.build_config_interval());
    Ok(watcher.spawn(token))
}
