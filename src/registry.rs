//! Plugin registry metadata lookup
//!
//! The registry is the authority on whether a plugin wants feedback at
//! all, and may override the embed icon and the destination webhook on a
//! per-plugin basis.

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use serde::Deserialize;

/// Metadata the registry publishes for one plugin
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginMetadata {
    /// Whether the plugin author opted in to receiving feedback
    #[serde(default)]
    pub accepts_feedback: bool,

    /// Override icon for the embed thumbnail
    #[serde(default)]
    pub icon_url: Option<String>,

    /// Override destination webhook
    #[serde(default)]
    pub feedback_url: Option<String>,
}

/// Registry lookup client
pub struct RegistryClient {
    base_url: String,
    client: reqwest::Client,
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch metadata for a plugin by name.
    ///
    /// Any non-success lookup status is reported as [`Error::PluginNotFound`];
    /// the registry does not distinguish "unknown" from "unavailable".
    pub async fn lookup(&self, name: &str) -> Result<PluginMetadata> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            tracing::debug!(plugin = %name, status = %response.status(), "Registry lookup failed");
            return Err(Error::PluginNotFound(name.to_string()));
        }

        Ok(response.json::<PluginMetadata>().await?)
    }
}
