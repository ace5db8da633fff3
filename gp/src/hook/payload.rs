//! GitHub-style push event payload

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BuildConfig, CommitRecord, CommitUser};

/// Head commit section of a push event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadCommit {
    pub id: String,
    pub author: CommitUser,
    pub committer: CommitUser,
    pub message: String,
}

/// The subset of a GitHub push event the build hook reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub after: String,
    pub head_commit: HeadCommit,
}

impl PushEvent {
    pub fn new(config: &BuildConfig, commit: &CommitRecord) -> Self {
        let git_ref = config.push_ref();
        debug!(id = %config.id, %git_ref, sha = %commit.sha, "PushEvent::new: called");
        Self {
            git_ref,
            after: commit.sha.clone(),
            head_commit: HeadCommit {
                id: commit.sha.clone(),
                author: commit.author.clone(),
                committer: commit.committer.clone(),
                message: commit.message.clone(),
            },
        }
    }
}
