//! Shared error types and the server's JSON error body.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Operation;

/// Placeholder shown for error fields the server left out.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// Error body returned by the HTTP endpoints and carried by `error` frames.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Attempt to parse an error body into a user-facing message.
/// Prefers `error_message`, prefixed with `message_type` when both are present.
pub fn try_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    let message = parsed.error_message.filter(|m| !m.trim().is_empty())?;
    match parsed.message_type.filter(|t| !t.trim().is_empty()) {
        Some(message_type) => Some(format!("{message_type}: {message}")),
        None => Some(message),
    }
}

/// Failure to turn an incoming frame into a typed response.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("could not parse message from server: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has no operation")]
    MissingOperation,
    #[error("could not decode '{operation}' payload: {source}")]
    Payload {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

/// API error type for the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl ApiError {
    /// The most readable description of this error for display.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { body, .. } => {
                try_error_message(body).unwrap_or_else(|| self.to_string())
            }
            other => other.to_string(),
        }
    }
}
