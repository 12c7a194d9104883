//! HTTP surface of the relay
//!
//! [`build_app`] assembles the axum router; `handle_feedback` runs the
//! whole pipeline for one submission. Every step either passes the report
//! along or terminates the request with its own response:
//!
//! 1. body extraction (JSON only)
//! 2. required-field validation
//! 3. mention abuse filter
//! 4. silent-ignore rules
//! 5. registry metadata lookup (when configured)
//! 6. reporter fingerprinting
//! 7. condensation (feature-flagged)
//! 8. outbound dispatch
//!
//! A dropped report and a delivered report both answer 200 with an empty
//! body; the sender cannot tell them apart.

use crate::condense::Condenser;
use crate::config::{resolve_credential, RelayConfig};
use crate::dispatch::{Dispatcher, WebhookMessage};
use crate::error::{Error, Result};
use crate::feedback::Feedback;
use crate::filter::{self, IgnoreSet};
use crate::fingerprint;
use crate::registry::RegistryClient;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Resolved default destination webhook
    webhook_url: Arc<String>,
    /// Resolved fingerprint pepper
    pepper: Arc<String>,
    /// Thumbnail template with `{plugin}` placeholder
    icon_template: Option<Arc<String>>,
    /// Silent-ignore rules
    ignore_sets: Arc<Vec<IgnoreSet>>,
    /// Registry client, when a registry is configured
    registry: Option<Arc<RegistryClient>>,
    condenser: Arc<Condenser>,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Build the runtime state from configuration.
    ///
    /// Credential references are resolved once, at startup.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Ok(Self {
            webhook_url: Arc::new(resolve_credential(&config.webhook.url)?),
            pepper: Arc::new(resolve_credential(&config.fingerprint.pepper)?),
            icon_template: config.webhook.icon_template.clone().map(Arc::new),
            ignore_sets: Arc::new(filter::default_ignore_sets()?),
            registry: config
                .registry
                .as_ref()
                .map(|r| Arc::new(RegistryClient::new(r))),
            condenser: Arc::new(Condenser::new(config.condenser.clone())),
            dispatcher: Arc::new(Dispatcher::new()),
        })
    }

    /// Replace the ignore rules (defaults otherwise)
    pub fn with_ignore_sets(mut self, sets: Vec<IgnoreSet>) -> Self {
        self.ignore_sets = Arc::new(sets);
        self
    }

    /// Default plugin icon for the embed thumbnail
    fn plugin_icon(&self, name: &str) -> Option<String> {
        self.icon_template
            .as_ref()
            .map(|t| t.replace("{plugin}", name))
    }
}

/// Build the complete relay HTTP application
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let cors = build_cors(cors_origins);

    Router::new()
        .route("/health", get(health_check))
        // GET on the root is answered with a fixed 400; any other verb
        // gets the router's 405
        .route("/", post(handle_feedback).get(unsupported))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn unsupported() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "unsupported")
}

/// Receive one feedback submission on `POST /`
async fn handle_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    match relay(&state, &headers, &body).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Run the pipeline for one submission. `Ok` covers both delivered and
/// silently dropped reports.
async fn relay(state: &AppState, headers: &HeaderMap, body: &Bytes) -> Result<()> {
    let feedback = read_feedback(headers, body)?;
    let report = feedback.require_complete()?;

    if filter::has_forbidden_field(&report) {
        tracing::info!(plugin = %report.name, "Feedback rejected by mention filter");
        return Err(Error::ForbiddenContent);
    }

    if filter::is_silently_ignored(&feedback, &state.ignore_sets) {
        tracing::info!(plugin = %report.name, "Feedback silently dropped by ignore rule");
        return Ok(());
    }

    let metadata = match &state.registry {
        Some(registry) => {
            let metadata = registry.lookup(report.name).await?;
            if !metadata.accepts_feedback {
                return Err(Error::FeedbackNotAccepted(report.name.to_string()));
            }
            Some(metadata)
        }
        None => None,
    };

    let reporter_id = fingerprint::client_ip(headers)
        .map(|ip| fingerprint::reporter_id(&ip, &state.pepper));

    let lead = state.condenser.lead(report.content).await;

    let icon_url = metadata
        .as_ref()
        .and_then(|m| m.icon_url.clone())
        .or_else(|| state.plugin_icon(report.name));
    let webhook_url = metadata
        .as_ref()
        .and_then(|m| m.feedback_url.clone())
        .unwrap_or_else(|| state.webhook_url.as_ref().clone());

    let message = WebhookMessage::compose(
        &report,
        &lead,
        reporter_id.as_deref(),
        icon_url.as_deref(),
        chrono::Utc::now(),
    );

    state.dispatcher.send(&webhook_url, &message).await
}

/// Parse the body as a feedback report.
///
/// The body only exists when the content type says JSON; anything else,
/// including unparseable JSON, reads as no body at all.
fn read_feedback(headers: &HeaderMap, body: &Bytes) -> Result<Feedback> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !content_type.contains("application/json") {
        return Err(Error::NoBody);
    }

    serde_json::from_slice(body).map_err(|_| Error::NoBody)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
