//! Build configuration as seen by the poller

use serde::{Deserialize, Serialize};

/// Branch used when a build configuration does not name a ref
pub const DEFAULT_REF: &str = "master";

/// A build trigger definition
///
/// Identity is `id`. The whole value is replaced on every poll of the
/// collection; nothing mutates it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Unique identifier of the configuration
    pub id: String,

    /// Git repository URI
    pub uri: String,

    /// Branch or tag to build (empty or absent means [`DEFAULT_REF`])
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Secret addressing the build hook endpoint
    pub secret: String,
}

impl BuildConfig {
    /// Create a configuration without an explicit ref
    pub fn new(id: impl Into<String>, uri: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            git_ref: None,
            secret: secret.into(),
        }
    }

    /// Set the ref to build
    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Ref to check out after cloning, if one was configured
    pub fn checkout_ref(&self) -> Option<&str> {
        self.git_ref.as_deref().filter(|r| !r.is_empty())
    }

    /// Branch name reported in push events
    pub fn branch(&self) -> &str {
        self.checkout_ref().unwrap_or(DEFAULT_REF)
    }

    /// Fully qualified ref reported in push events
    pub fn push_ref(&self) -> String {
        format!("refs/heads/{}", self.branch())
    }
}
