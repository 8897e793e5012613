//! Inference error types and classification.

use serde_json::Value;
use thiserror::Error;

/// User-facing failure of a chat call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    /// The inference service refused or could not accept the connection.
    #[error("cannot reach inference service at {url}")]
    ServiceUnavailable { url: String },

    /// Every attempt timed out.
    #[error("request took too long, try again")]
    Timeout,

    /// The service answered with a non-2xx status.
    #[error("{status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Unknown(String),
}

impl InferenceError {
    /// Status used in the HTTP error envelope
    pub fn http_status(&self) -> u16 {
        match self {
            InferenceError::ServiceUnavailable { .. } => 503,
            InferenceError::Timeout => 504,
            InferenceError::Upstream { .. } => 502,
            InferenceError::Unknown(_) => 500,
        }
    }
}

/// Raw outcome of one failed send, before classification.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// Timed out or aborted; the only retryable kind
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {status} {status_text}")]
    Status {
        status: u16,
        status_text: String,
        body: Option<Value>,
    },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        // a connect timeout reports both; it counts as a timeout
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }

    /// Map to the user-facing taxonomy. `base_url` is reported for connection failures.
    pub fn classify(self, base_url: &str) -> InferenceError {
        match self {
            TransportError::Connect(_) => InferenceError::ServiceUnavailable {
                url: base_url.to_string(),
            },
            TransportError::Timeout(_) => InferenceError::Timeout,
            TransportError::Status { status, status_text, body } => InferenceError::Upstream {
                status,
                message: upstream_message(body.as_ref(), &status_text),
            },
            TransportError::Other(message) => InferenceError::Unknown(message),
        }
    }
}

/// Best-effort message from an error body: string `error`, object `error`,
/// string body, any other body, then the status text.
fn upstream_message(body: Option<&Value>, status_text: &str) -> String {
    let Some(body) = body else {
        return status_text.to_string();
    };

    match body.get("error") {
        Some(Value::String(s)) => return s.clone(),
        Some(err @ (Value::Object(_) | Value::Array(_))) => return err.to_string(),
        _ => {}
    }

    match body {
        Value::String(s) if !s.is_empty() => s.clone(),
        // an empty string body falls back to the status text, not ""
        Value::String(_) | Value::Null => status_text.to_string(),
        other => other.to_string(),
    }
}
