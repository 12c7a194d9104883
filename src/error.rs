//! Relay error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Relay error type
///
/// The first six variants are the terminal request outcomes; each maps
/// 1:1 onto the HTTP status the handler answers with. The remaining
/// variants are internal faults that surface as 500.
#[derive(Error, Debug)]
pub enum Error {
    /// Request carried no JSON body
    #[error("no body")]
    NoBody,

    /// A required feedback field is missing or empty
    #[error("no content")]
    NoContent,

    /// A scanned field matched the mass-mention filter
    #[error("forbidden content")]
    ForbiddenContent,

    /// Registry lookup did not return metadata for the plugin
    #[error("unknown plugin: {0}")]
    PluginNotFound(String),

    /// Plugin opted out of receiving feedback
    #[error("feedback not accepted for plugin: {0}")]
    FeedbackNotAccepted(String),

    /// Downstream webhook did not acknowledge the message
    #[error("dispatch failed")]
    DispatchFailed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Condensation error
    #[error("Condensation error: {0}")]
    Condense(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status this error terminates a request with
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NoBody | Error::NoContent | Error::DispatchFailed => StatusCode::BAD_REQUEST,
            Error::ForbiddenContent => StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS,
            Error::PluginNotFound(_) => StatusCode::NOT_FOUND,
            Error::FeedbackNotAccepted(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed plain-text response body for this error
    fn body(&self) -> &'static str {
        match self {
            Error::NoBody => "no body",
            Error::NoContent => "no content",
            Error::ForbiddenContent => "forbidden content",
            Error::PluginNotFound(_) => "unknown plugin",
            Error::FeedbackNotAccepted(_) => "feedback not accepted",
            Error::DispatchFailed => "dispatch failed",
            _ => "internal error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
        }
        (status, self.body()).into_response()
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;
