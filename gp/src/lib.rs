//! gitpoll - trigger OpenShift builds from git commits
//!
//! gitpoll polls the OpenShift master for build configurations, keeps a
//! private clone of each configured repository and, whenever the head of
//! the configured ref moves, posts a GitHub-style push event to the build
//! configuration's hook.
//!
//! # Modules
//!
//! - [`domain`] - Build configurations and commit records
//! - [`source`] - Fetching the build configuration list
//! - [`git`] - Git operations used by the repository watcher
//! - [`watcher`] - Collection and repository polling watchers
//! - [`hook`] - Watcher lifecycle management and build hook delivery
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod git;
pub mod hook;
pub mod source;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{Config, GitConfig, HookConfig};
pub use domain::{BuildConfig, CommitParseError, CommitRecord, CommitUser};
pub use git::{CliGit, Git, GitError};
pub use hook::{BuildLauncher, DispatchError, HookManager, Notifier, PushEvent, StartError, WebhookDispatcher};
pub use source::{BuildConfigSource, HttpBuildConfigSource, SourceError};
pub use watcher::{
    CollectionListener, CollectionWatcher, CommitListener, RepositoryWatcher, SnapshotStore, WatcherConfig,
    WatcherHandle,
};
