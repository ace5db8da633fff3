//! OpenShift v1beta1 build configuration client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{BuildConfigSource, SourceError};
use crate::domain::BuildConfig;

/// API path listing build configurations, relative to the master endpoint
pub const BUILD_CONFIGS_PATH: &str = "osapi/v1beta1/buildConfigs";

#[derive(Debug, Deserialize)]
struct BuildConfigList {
    #[serde(default)]
    items: Vec<ApiBuildConfig>,
}

#[derive(Debug, Deserialize)]
struct ApiBuildConfig {
    #[serde(default)]
    id: String,

    #[serde(default)]
    secret: String,

    #[serde(default)]
    parameters: ApiBuildParameters,
}

#[derive(Debug, Default, Deserialize)]
struct ApiBuildParameters {
    #[serde(default)]
    source: ApiBuildSource,
}

#[derive(Debug, Default, Deserialize)]
struct ApiBuildSource {
    #[serde(rename = "type", default)]
    kind: String,

    git: Option<ApiGitSource>,
}

#[derive(Debug, Deserialize)]
struct ApiGitSource {
    uri: String,

    #[serde(rename = "ref", default)]
    git_ref: String,
}

impl ApiBuildConfig {
    fn into_domain(self) -> Option<BuildConfig> {
        if self.id.is_empty() {
            warn!("Skipping build config without an id");
            return None;
        }

        let Some(git) = self.parameters.source.git else {
            warn!(id = %self.id, kind = %self.parameters.source.kind, "Skipping build config without a git source");
            return None;
        };

        let git_ref = (!git.git_ref.is_empty()).then_some(git.git_ref);
        Some(BuildConfig {
            id: self.id,
            uri: git.uri,
            git_ref,
            secret: self.secret,
        })
    }
}

/// Lists build configurations from `{endpoint}/osapi/v1beta1/buildConfigs`
pub struct HttpBuildConfigSource {
    url: String,
    http: Client,
}

impl HttpBuildConfigSource {
    /// Create a source for the given master endpoint
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SourceError> {
        debug!(%endpoint, ?timeout, "HttpBuildConfigSource::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(endpoint, http))
    }

    /// Create a source reusing an existing HTTP client
    pub fn with_client(endpoint: &str, http: Client) -> Self {
        Self {
            url: format!("{}/{}", endpoint.trim_end_matches('/'), BUILD_CONFIGS_PATH),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BuildConfigSource for HttpBuildConfigSource {
    async fn list(&self) -> Result<Vec<BuildConfig>, SourceError> {
        debug!(url = %self.url, "HttpBuildConfigSource::list: called");
        let response = self.http.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "HttpBuildConfigSource::list: non-success status");
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let list: BuildConfigList =
            serde_json::from_str(&body).map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        let configs: Vec<BuildConfig> = list.items.into_iter().filter_map(ApiBuildConfig::into_domain).collect();
        debug!(count = configs.len(), "HttpBuildConfigSource::list: parsed build configs");
        Ok(configs)
    }
}
