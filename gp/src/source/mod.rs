//! Build configuration sources
//!
//! The collection watcher only needs "give me the full current list".
//! [`HttpBuildConfigSource`] reads it from the OpenShift master API.

mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::BuildConfig;

pub use http::{BUILD_CONFIGS_PATH, HttpBuildConfigSource};

/// Errors fetching the build configuration list
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Source of the complete, current set of build configurations
#[async_trait]
pub trait BuildConfigSource: Send + Sync {
    /// Fetch every build configuration known right now
    async fn list(&self) -> Result<Vec<BuildConfig>, SourceError>;
}
