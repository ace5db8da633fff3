//! Polling watchers
//!
//! The [`CollectionWatcher`] polls the build configuration collection and
//! reports additions and removals to a [`CollectionListener`]. A
//! [`RepositoryWatcher`] polls one git repository through a private clone
//! and reports new head commits to a [`CommitListener`].

mod collection;
mod config;
mod repository;
mod snapshot;

pub use collection::{CollectionListener, CollectionWatcher, SyncReport};
pub use config::WatcherConfig;
pub(crate) use config::MIN_TICK;
pub use repository::{CommitListener, CommitReadError, RepositoryError, RepositoryWatcher, TickOutcome, WatcherHandle};
pub use snapshot::SnapshotStore;
