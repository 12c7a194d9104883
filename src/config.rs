//! Relay configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound webhook configuration
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Plugin registry configuration; lookup is skipped when absent
    #[serde(default)]
    pub registry: Option<RegistryConfig>,

    /// Reporter fingerprinting configuration
    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    /// Feedback condensation configuration
    #[serde(default)]
    pub condenser: CondenserConfig,
}

impl RelayConfig {
    /// Parse configuration from an HCL string.
    ///
    /// JSON input is auto-detected for compatibility with generated
    /// config files.
    pub fn from_hcl(content: &str) -> anyhow::Result<Self> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') {
            return serde_json::from_str(content)
                .map_err(|e| anyhow::anyhow!("Failed to parse JSON config: {}", e));
        }
        hcl::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            cors_origins: Vec::new(),
        }
    }
}

/// Outbound webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Default destination webhook: env var name or inline URL
    pub url: String,

    /// Embed thumbnail template; `{plugin}` is replaced with the plugin
    /// name. No thumbnail is attached when unset and the registry supplies
    /// no icon.
    pub icon_template: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: "DEFAULT_WEBHOOK".to_string(),
            icon_template: None,
        }
    }
}

/// Plugin registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL; the plugin name is appended as the last path segment
    pub url: String,
}

/// Reporter fingerprinting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Pepper mixed into the IP digest: env var name or inline secret
    pub pepper: String,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            pepper: "FEEDBACK_PEPPER".to_string(),
        }
    }
}

/// Feedback condensation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CondenserConfig {
    /// Master switch; condensation is skipped entirely when off
    pub enabled: bool,

    /// Completion-service API token: env var name or inline value
    pub api_token: String,

    /// Completion endpoint base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,
}

impl Default for CondenserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_token: "OPENAI_TOKEN".to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// Resolve a credential reference: try environment variable first, fall
/// back to the inline value.
///
/// This allows config files to use either:
/// - An env var name: `"DEFAULT_WEBHOOK"` → reads `$DEFAULT_WEBHOOK`
/// - An inline value: `"https://discord.com/api/webhooks/..."` → used directly
pub fn resolve_credential(credential_ref: &str) -> Result<String> {
    if let Ok(val) =
        std::env::var(credential_ref).or_else(|_| std::env::var(credential_ref.to_uppercase()))
    {
        return Ok(val);
    }
    if !credential_ref.is_empty() {
        return Ok(credential_ref.to_string());
    }
    Err(Error::Config(format!(
        "Failed to resolve credential: {}",
        credential_ref
    )))
}

/// Load configuration using the standard priority chain.
///
/// Priority: explicit path > `./feedback-relay.hcl`
///           > `~/.config/feedback-relay/config.hcl` > default.
pub fn load_config(explicit_path: Option<&PathBuf>) -> anyhow::Result<(RelayConfig, Option<PathBuf>)> {
    if let Some(path) = explicit_path {
        let content = std::fs::read_to_string(path)?;
        tracing::info!("Loading config from {}", path.display());
        return Ok((RelayConfig::from_hcl(&content)?, Some(path.clone())));
    }

    if std::path::Path::new("feedback-relay.hcl").exists() {
        let content = std::fs::read_to_string("feedback-relay.hcl")?;
        tracing::info!("Loading config from ./feedback-relay.hcl");
        return Ok((
            RelayConfig::from_hcl(&content)?,
            Some(PathBuf::from("feedback-relay.hcl")),
        ));
    }

    if let Some(config_dir) = dirs_next::config_dir() {
        let hcl_path = config_dir.join("feedback-relay/config.hcl");
        if hcl_path.exists() {
            let content = std::fs::read_to_string(&hcl_path)?;
            tracing::info!("Loading config from {}", hcl_path.display());
            return Ok((RelayConfig::from_hcl(&content)?, Some(hcl_path)));
        }
    }

    tracing::info!("No config found, using defaults");
    Ok((RelayConfig::default(), None))
}
