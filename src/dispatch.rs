//! Outbound chat-webhook message and delivery
//!
//! Builds the Discord-style webhook payload for one validated report and
//! posts it to the resolved destination. One attempt per request; the
//! downstream acknowledges delivery with 204.

use crate::error::{Error, Result};
use crate::feedback::CompleteFeedback;
use crate::filter;
use crate::fingerprint;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Embed accent color
const EMBED_COLOR: u32 = 11_289_400;

/// Exception text is truncated to this many characters in the payload
const EXCEPTION_LIMIT: usize = 950;

/// Author label when neither a reporter nor a fingerprint is available
const UNKNOWN_REPORTER: &str = "Unknown Reporter";

/// Complete webhook message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMessage {
    /// Top-level content line: `"{plugin}: {lead}"`
    pub content: String,
    /// Mention parsing is disabled outright on the payload
    pub allowed_mentions: AllowedMentions,
    /// Single feedback embed
    pub embeds: Vec<Embed>,
}

/// Mention-parsing restrictions for the downstream platform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllowedMentions {
    /// Mention types the platform may parse; always empty
    pub parse: Vec<String>,
}

/// One feedback embed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    /// `"Feedback for {plugin}"`
    pub title: String,
    /// The feedback body, verbatim
    pub description: String,
    /// Reporter attribution; always present, possibly pseudonymous
    pub author: EmbedAuthor,
    pub color: u32,
    /// RFC 3339 submission timestamp
    pub timestamp: String,
    /// Plugin icon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    /// Version fields, plus the optional exception block
    pub fields: Vec<EmbedField>,
}

/// Embed author block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Embed thumbnail block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedThumbnail {
    pub url: String,
}

/// One embed field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

impl WebhookMessage {
    /// Compose the outbound message for one validated report.
    ///
    /// `reporter_id` is the pseudonymous fingerprint, when one could be
    /// derived; `icon_url` is the resolved plugin icon, when any. The
    /// timestamp is passed in so identical reports compose identically.
    pub fn compose(
        report: &CompleteFeedback<'_>,
        lead: &str,
        reporter_id: Option<&str>,
        icon_url: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        // A reporter that trips the mention filter is demoted to anonymous
        let named_reporter = report
            .reporter
            .filter(|r| !filter::contains_forbidden(r));
        let author_name = match (named_reporter, reporter_id) {
            (Some(reporter), _) => reporter.to_string(),
            (None, Some(id)) => format!("Anonymous Reporter {id}"),
            (None, None) => UNKNOWN_REPORTER.to_string(),
        };

        let mut fields = vec![
            EmbedField {
                name: "Plugin Version".to_string(),
                value: report.version.to_string(),
                inline: Some(true),
            },
            EmbedField {
                name: "Host Version".to_string(),
                value: report.dhash.to_string(),
                inline: Some(true),
            },
        ];

        // Forbidden exception text is dropped rather than rejected
        if let Some(exception) = report
            .exception
            .filter(|e| !filter::contains_forbidden(e))
        {
            let truncated: String = exception.chars().take(EXCEPTION_LIMIT).collect();
            fields.push(EmbedField {
                name: "Exception".to_string(),
                value: format!("```{truncated}```"),
                inline: None,
            });
        }

        Self {
            content: format!("{}: {}", report.name, lead),
            allowed_mentions: AllowedMentions { parse: Vec::new() },
            embeds: vec![Embed {
                title: format!("Feedback for {}", report.name),
                description: report.content.to_string(),
                author: EmbedAuthor {
                    name: author_name,
                    icon_url: reporter_id.map(fingerprint::avatar_url),
                },
                color: EMBED_COLOR,
                timestamp: timestamp.to_rfc3339(),
                thumbnail: icon_url.map(|url| EmbedThumbnail {
                    url: url.to_string(),
                }),
                fields,
            }],
        }
    }
}

/// Outbound webhook delivery
pub struct Dispatcher {
    client: reqwest::Client,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// POST the message to `url`, exactly once.
    ///
    /// Delivery counts as successful only on a 204 acknowledgement; any
    /// other status, and any transport failure, is [`Error::DispatchFailed`].
    pub async fn send(&self, url: &str, message: &WebhookMessage) -> Result<()> {
        let body = serde_json::to_string(message)?;
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json;charset=UTF-8")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Webhook dispatch failed: {}", e);
                Error::DispatchFailed
            })?;

        if response.status() != reqwest::StatusCode::NO_CONTENT {
            tracing::warn!(status = %response.status(), "Webhook dispatch rejected");
            return Err(Error::DispatchFailed);
        }

        tracing::debug!("Feedback dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Feedback;
    use chrono::TimeZone;

    fn feedback() -> Feedback {
        Feedback {
            content: Some("crashes on load".to_string()),
            name: Some("MyPlugin".to_string()),
            version: Some("1.2.3".to_string()),
            dhash: Some("abcd1234".to_string()),
            reporter: Some("user@example.com".to_string()),
            exception: None,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_compose_basic_shape() {
        let fb = feedback();
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(&report, "User Feedback", None, None, at());

        assert_eq!(message.content, "MyPlugin: User Feedback");
        assert!(message.allowed_mentions.parse.is_empty());
        assert_eq!(message.embeds.len(), 1);

        let embed = &message.embeds[0];
        assert_eq!(embed.title, "Feedback for MyPlugin");
        assert_eq!(embed.description, "crashes on load");
        assert_eq!(embed.author.name, "user@example.com");
        assert_eq!(embed.color, 11_289_400);
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[0].name, "Plugin Version");
        assert_eq!(embed.fields[0].value, "1.2.3");
        assert_eq!(embed.fields[1].name, "Host Version");
        assert_eq!(embed.fields[1].value, "abcd1234");
    }

    #[test]
    fn test_compose_no_optional_fields() {
        let mut fb = feedback();
        fb.reporter = None;
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(&report, "User Feedback", None, None, at());

        let embed = &message.embeds[0];
        assert_eq!(embed.author.name, "Unknown Reporter");
        assert!(embed.author.icon_url.is_none());
        assert!(embed.fields.iter().all(|f| f.name != "Exception"));
    }

    #[test]
    fn test_compose_anonymous_reporter() {
        let mut fb = feedback();
        fb.reporter = None;
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(&report, "User Feedback", Some("cafe1234"), None, at());

        let embed = &message.embeds[0];
        assert_eq!(embed.author.name, "Anonymous Reporter cafe1234");
        let icon = embed.author.icon_url.as_deref().unwrap();
        assert!(icon.contains("seed=cafe1234"));
    }

    #[test]
    fn test_compose_forbidden_reporter_demoted() {
        let mut fb = feedback();
        fb.reporter = Some("<@123456>".to_string());
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(&report, "User Feedback", Some("cafe1234"), None, at());
        assert_eq!(message.embeds[0].author.name, "Anonymous Reporter cafe1234");
    }

    #[test]
    fn test_compose_exception_truncated() {
        let mut fb = feedback();
        fb.exception = Some("x".repeat(2000));
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(&report, "User Feedback", None, None, at());

        let exception = message.embeds[0]
            .fields
            .iter()
            .find(|f| f.name == "Exception")
            .unwrap();
        assert_eq!(exception.value, format!("```{}```", "x".repeat(950)));
    }

    #[test]
    fn test_compose_forbidden_exception_dropped() {
        let mut fb = feedback();
        fb.exception = Some("stack trace @everyone".to_string());
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(&report, "User Feedback", None, None, at());
        assert!(message.embeds[0].fields.iter().all(|f| f.name != "Exception"));
    }

    #[test]
    fn test_compose_thumbnail_from_icon() {
        let fb = feedback();
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(
            &report,
            "User Feedback",
            None,
            Some("https://example.com/icon.png"),
            at(),
        );
        assert_eq!(
            message.embeds[0].thumbnail.as_ref().unwrap().url,
            "https://example.com/icon.png"
        );
    }

    #[test]
    fn test_compose_identical_inputs_identical_payloads() {
        let fb = feedback();
        let report = fb.require_complete().unwrap();
        let a = WebhookMessage::compose(&report, "User Feedback", Some("cafe1234"), None, at());
        let b = WebhookMessage::compose(&report, "User Feedback", Some("cafe1234"), None, at());
        assert_eq!(a, b);
    }

    #[test]
    fn test_serialized_shape() {
        let fb = feedback();
        let report = fb.require_complete().unwrap();
        let message = WebhookMessage::compose(&report, "User Feedback", None, None, at());
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["content"], "MyPlugin: User Feedback");
        assert_eq!(value["allowed_mentions"]["parse"], serde_json::json!([]));
        assert_eq!(value["embeds"][0]["title"], "Feedback for MyPlugin");
        // absent optionals are omitted, not null
        assert!(value["embeds"][0].get("thumbnail").is_none());
        assert!(value["embeds"][0]["fields"][2].is_null());
    }
}
