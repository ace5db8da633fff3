//! Domain types shared by the watchers and the webhook dispatcher
//!
//! - [`BuildConfig`] - one build trigger: repository, ref and hook secret
//! - [`CommitRecord`] - the most recent commit of a tracked repository

mod build_config;
mod commit;

pub use build_config::{BuildConfig, DEFAULT_REF};
pub use commit::{COMMIT_FIELD_COUNT, COMMIT_LOG_FORMAT, CommitParseError, CommitRecord, CommitUser};
