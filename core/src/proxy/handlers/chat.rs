//! Chat handlers
//! Handles /api/chat/message, /api/chat/status, /api/chat/config

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::{json, Value};

use super::{success, timestamp, ApiError};
use crate::proxy::mappers::history::history_entries;
use crate::proxy::server::AppState;

pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const ASSISTANT_NAME: &str = "Lia";

/// Handle POST /api/chat/message
pub async fn handle_send_message(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(reject_body)?;

    let message = validate_message(body.get("message"))?;
    let history = history_entries(body.get("conversationHistory"));

    let request_id = uuid::Uuid::new_v4().simple().to_string();
    tracing::info!("[{}] Message received: \"{}\"", &request_id[..8], message);

    // Detached so a client hanging up does not abort the call to LM Studio
    let client = state.client.clone();
    let (message, history) = (message.to_string(), history.to_vec());
    let outcome = tokio::spawn(async move { client.chat(&message, &history).await })
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let reply = outcome.map_err(|e| {
        tracing::error!("[{}] Chat failed: {}", &request_id[..8], e);
        ApiError::from(e)
    })?;

    Ok(success(json!({
        "message": reply,
        "timestamp": timestamp(),
    })))
}

/// Handle GET /api/chat/status
pub async fn handle_status(State(state): State<AppState>) -> Response {
    let available = state.client.health_check().await;

    success(json!({
        "server": "online",
        "inference": if available { "connected" } else { "disconnected" },
        "model": state.client.model(),
        "timestamp": timestamp(),
    }))
}

/// Handle GET /api/chat/config
pub async fn handle_config(State(state): State<AppState>) -> Response {
    success(json!({
        "assistantName": ASSISTANT_NAME,
        "language": state.business.language,
        "businessName": state.business.name,
    }))
}

fn validate_message(raw: Option<&Value>) -> Result<&str, ApiError> {
    let message = match raw {
        Some(Value::String(s)) if !s.is_empty() => s.as_str(),
        _ => return Err(ApiError::bad_request("message is required and must be text")),
    };

    if message.trim().is_empty() {
        return Err(ApiError::bad_request("message cannot be empty"));
    }

    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(format!(
            "message is too long (maximum {} characters)",
            MAX_MESSAGE_CHARS
        )));
    }

    Ok(message)
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonSyntaxError(_)
        | JsonRejection::JsonDataError(_)
        | JsonRejection::MissingJsonContentType(_) => {
            ApiError::bad_request("invalid JSON in request body")
        }
        other => ApiError::new(other.status(), other.body_text()),
    }
}
