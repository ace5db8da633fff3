//! Commit records read from `git log`

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pretty format passed to `git log`, one field per `|`
pub const COMMIT_LOG_FORMAT: &str = "%H|%an|%ae|%cn|%ce|%s";

/// Number of fields produced by [`COMMIT_LOG_FORMAT`]
pub const COMMIT_FIELD_COUNT: usize = 6;

/// Errors parsing `git log` output into a [`CommitRecord`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitParseError {
    #[error("Malformed commit output: expected {expected} fields, got {found}")]
    MissingFields { expected: usize, found: usize },

    #[error("Malformed commit output: empty commit hash")]
    EmptyHash,
}

/// Author or committer identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitUser {
    pub name: String,
    pub email: String,
}

impl CommitUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// The most recent commit of a repository checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit hash
    pub sha: String,

    /// Subject line
    pub message: String,

    pub author: CommitUser,

    pub committer: CommitUser,
}

impl CommitRecord {
    /// Parse a single line produced by `git log --pretty=<COMMIT_LOG_FORMAT> -n1`
    ///
    /// The subject is the last field, so any `|` inside it is kept.
    pub fn parse_log_line(output: &str) -> Result<Self, CommitParseError> {
        let line = output.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.splitn(COMMIT_FIELD_COUNT, '|').collect();

        if fields.len() < COMMIT_FIELD_COUNT {
            return Err(CommitParseError::MissingFields {
                expected: COMMIT_FIELD_COUNT,
                found: fields.len(),
            });
        }

        let sha = fields[0].trim();
        if sha.is_empty() {
            return Err(CommitParseError::EmptyHash);
        }

        Ok(Self {
            sha: sha.to_string(),
            author: CommitUser::new(fields[1], fields[2]),
            committer: CommitUser::new(fields[3], fields[4]),
            message: fields[5].to_string(),
        })
    }

    /// Abbreviated hash for log lines
    pub fn short_sha(&self) -> &str {
        self.sha.get(..8).unwrap_or(&self.sha)
    }
}
