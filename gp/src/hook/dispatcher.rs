//! Build hook delivery

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use thiserror::Error;
use tracing::{debug, info};

use super::payload::PushEvent;
use crate::config::HookConfig;
use crate::domain::{BuildConfig, CommitRecord};

/// Build hook path, relative to the master endpoint
pub const HOOK_PATH: &str = "osapi/v1beta1/buildConfigHooks";

/// Provider segment selecting the GitHub payload parser
pub const HOOK_PROVIDER: &str = "github";

/// Header carrying the event type
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Errors delivering a push event
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unable to marshal git push event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Webhook post request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Webhook request returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Turns a detected commit into a build trigger
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, config: &BuildConfig, commit: &CommitRecord) -> Result<(), DispatchError>;
}

/// Hook URL for a build configuration
pub fn webhook_url(endpoint: &str, config: &BuildConfig) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        endpoint.trim_end_matches('/'),
        HOOK_PATH,
        config.id,
        config.secret,
        HOOK_PROVIDER
    )
}

/// POSTs GitHub-style push events to the OpenShift build hook
///
/// One request per commit, no retry.
pub struct WebhookDispatcher {
    endpoint: String,
    user_agent: String,
    http: Client,
}

impl WebhookDispatcher {
    pub fn new(endpoint: &str, config: &HookConfig) -> Result<Self, DispatchError> {
        debug!(%endpoint, ?config, "WebhookDispatcher::new: called");
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(endpoint, &config.user_agent, http))
    }

    /// Create a dispatcher reusing an existing HTTP client
    pub fn with_client(endpoint: &str, user_agent: &str, http: Client) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            user_agent: user_agent.to_string(),
            http,
        }
    }
}

#[async_trait]
impl Notifier for WebhookDispatcher {
    async fn notify(&self, config: &BuildConfig, commit: &CommitRecord) -> Result<(), DispatchError> {
        debug!(id = %config.id, sha = %commit.sha, "WebhookDispatcher::notify: called");
        let body = serde_json::to_vec(&PushEvent::new(config, commit))?;

        // The URL embeds the hook secret, so it is never logged.
        let response = self
            .http
            .post(webhook_url(&self.endpoint, config))
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .header(EVENT_HEADER, "push")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "WebhookDispatcher::notify: non-success status");
            let message = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        info!(id = %config.id, sha = %commit.short_sha(), "Build hook triggered");
        Ok(())
    }
}
