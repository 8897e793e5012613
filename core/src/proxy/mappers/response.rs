//! Inference response to plain text conversion
//!
//! The endpoint's response shape is not fixed, so the body is matched against an
//! ordered table of known shapes and the first one that yields text wins.
//! Extraction never fails: an unusable body produces a placeholder reply.

use serde_json::Value;

pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "Error: empty response from the model";
pub const UNRECOGNIZED_RESPONSE_PLACEHOLDER: &str =
    "Error: could not extract the model's reply. Please check the LM Studio configuration.";

/// Flat string fields tried in this order when no structured shape matches
pub const FLAT_FIELDS: [&str; 6] = ["response", "content", "text", "message", "result", "answer"];

type ShapeExtractor = fn(&Value) -> Option<String>;

/// Priority-ordered shape cascade
pub const SHAPES: [(&str, ShapeExtractor); 5] = [
    ("text_body", text_body),
    ("empty_body", empty_body),
    ("output_array", output_array),
    ("choices", choices),
    ("flat_field", flat_field),
];

/// Extract the assistant reply from a raw response body.
pub fn extract_reply(body: &Value) -> String {
    for (name, extractor) in SHAPES.iter() {
        if let Some(text) = extractor(body) {
            tracing::debug!("Response extracted via {} shape", name);
            return text;
        }
    }

    let keys: Vec<&str> = body
        .as_object()
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default();
    tracing::error!("Unrecognized response format. Top-level keys: {:?}", keys);
    tracing::error!(
        "Full response body: {}",
        serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
    );

    UNRECOGNIZED_RESPONSE_PLACEHOLDER.to_string()
}

/// Body that is already plain text
fn text_body(body: &Value) -> Option<String> {
    body.as_str().map(str::to_string)
}

fn empty_body(body: &Value) -> Option<String> {
    if body.is_null() {
        tracing::error!("Empty or null response from the model");
        Some(EMPTY_RESPONSE_PLACEHOLDER.to_string())
    } else {
        None
    }
}

/// LM Studio: `{ "output": [ { "type": "message", "content": "..." } ] }`
fn output_array(body: &Value) -> Option<String> {
    let output = body.get("output")?.as_array()?;
    let first = output.first()?;

    let message = output.iter().find_map(|item| {
        if item.get("type").and_then(|t| t.as_str()) == Some("message") {
            item.get("content").and_then(|c| c.as_str())
        } else {
            None
        }
    });

    message
        .or_else(|| first.as_str())
        .or_else(|| first.get("content").and_then(|c| c.as_str()))
        .map(str::to_string)
}

/// OpenAI-compatible: `{ "choices": [ { "message": { "content": "..." } } ] }`
fn choices(body: &Value) -> Option<String> {
    let choice = body.get("choices")?.as_array()?.first()?;

    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .or_else(|| choice.get("text").and_then(|t| t.as_str()))
        .or_else(|| choice.get("content").and_then(|c| c.as_str()))
        .map(str::to_string)
}

fn flat_field(body: &Value) -> Option<String> {
    FLAT_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
}
