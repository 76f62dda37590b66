//! Error types for the chat protocol client.

use reqwest::StatusCode;
use thiserror::Error;

/// Format an API error body for display, extracting the message from
/// JSON if present.
///
/// Handles common payload shapes:
/// - `{"error": {"message": "...", "code": "..."}}`
/// - `{"error": "..."}`
/// - `{"message": "..."}`
/// - Plain text bodies are returned as-is.
#[must_use]
pub fn format_api_error(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(msg) = extract_error_message(&json)
    {
        return msg;
    }
    body.to_string()
}

fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    if let Some(error_obj) = json.get("error") {
        if let Some(msg) = error_obj.get("message").and_then(|v| v.as_str()) {
            if let Some(code) = error_obj.get("code").and_then(|v| v.as_str()) {
                return Some(format!("{msg} (code: {code})"));
            }
            return Some(msg.to_string());
        }
        if let Some(msg) = error_obj.as_str() {
            return Some(msg.to_string());
        }
    }
    json.get("message")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[derive(Debug, Error)]
pub enum Error {
    /// Client-side configuration problem (bad endpoint or credential).
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-2xx response from the backend. Carries the original status
    /// and response body for diagnosis.
    #[error("HTTP {status}: {}", format_api_error(.body))]
    HttpStatus { status: StatusCode, body: String },

    /// Missing or unexpected `Content-Type` on a non-streaming response.
    #[error("unexpected response content type: {}", .0.as_deref().unwrap_or("<missing>"))]
    ContentType(Option<String>),

    /// A malformed JSON line or document. `content` is the offending text.
    #[error("invalid JSON ({source}) in {content:?}")]
    Decode {
        content: String,
        source: serde_json::Error,
    },

    /// Network/connection failure from the underlying transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The attached cancellation token fired mid-stream.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// HTTP status of the failed response, if this is a status error.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
