//! Feature-flagged feedback condensation
//!
//! When enabled, asks an OpenAI-compatible chat-completion endpoint for a
//! one-line summary of the feedback body to use as the message lead line.
//! Condensation is best-effort by contract: any failure degrades to a
//! fixed fallback and never aborts the request.

use crate::config::{resolve_credential, CondenserConfig};
use crate::error::{Error, Result};
use crate::filter;
use serde::Deserialize;

/// Lead line used when condensation is disabled or skipped
pub const DEFAULT_LEAD: &str = "User Feedback";

/// Lead line used when condensation was attempted and failed
pub const FALLBACK_LEAD: &str = "Couldn't condense";

/// Content length bounds (exclusive) outside which condensation is skipped
const MIN_CONTENT_CHARS: usize = 10;
const MAX_CONTENT_CHARS: usize = 1200;

const SYSTEM_PROMPT: &str = "You are a chat bot dedicated to summarizing user feedback for software. \
    Please summarize it in one line. If the feedback is in a language other than English, please \
    translate it beforehand. Don't output anything but the summarized content and don't prefix \
    the output with terms like \"Summary\" or \"Feedback\".";

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Completion-service client for summarizing feedback bodies
pub struct Condenser {
    config: CondenserConfig,
    client: reqwest::Client,
}

impl Condenser {
    /// Create a new condenser
    pub fn new(config: CondenserConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Whether this content is worth condensing at all
    fn wants(&self, content: &str) -> bool {
        let len = content.chars().count();
        self.config.enabled && len > MIN_CONTENT_CHARS && len < MAX_CONTENT_CHARS
    }

    /// Produce the message lead line for a feedback body.
    ///
    /// Never fails: errors from the completion service are logged and
    /// replaced with [`FALLBACK_LEAD`].
    pub async fn lead(&self, content: &str) -> String {
        if !self.wants(content) {
            return DEFAULT_LEAD.to_string();
        }
        match self.condense(content).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Couldn't condense feedback: {}", e);
                FALLBACK_LEAD.to_string()
            }
        }
    }

    async fn condense(&self, content: &str) -> Result<String> {
        let token = resolve_credential(&self.config.api_token)?;
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": content},
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Condense(format!(
                "completion service returned {}",
                response.status()
            )));
        }

        let completion: ChatCompletion = response.json().await?;
        let summary = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Condense("completion had no choices".to_string()))?;

        // A summary that would trip the mention filter counts as a failure
        if filter::contains_forbidden(&summary) {
            return Err(Error::ForbiddenContent);
        }

        Ok(summary)
    }
}
