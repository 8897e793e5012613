//! Conversation history to LM Studio `input` conversion
//!
//! The endpoint only accepts `{ model, system_prompt, input }`, so prior turns
//! are flattened into a dialogue transcript inside `input`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const USER_LABEL: &str = "Usuario";
pub const ASSISTANT_LABEL: &str = "LIA";

/// One message of a conversation as the frontend keeps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "role": self.role, "content": self.content })
    }
}

/// The single request shape understood by the endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub system_prompt: String,
    pub input: String,
}

/// Build the dialogue transcript for `input`.
///
/// Only the last `max_history` raw entries are considered; skipped entries still
/// occupy their slot in that window. Entries that are not objects, have non-string
/// or blank `content`, or a role other than `user`/`assistant` are dropped silently.
/// The result always ends with the current message and the `LIA:` cue line.
pub fn build_input(user_message: &str, history: &[Value], max_history: usize) -> String {
    let start = history.len().saturating_sub(max_history);
    let window = &history[start..];

    let mut lines: Vec<String> = window.iter().filter_map(render_turn).collect();

    lines.push(format!("{}: {}", USER_LABEL, user_message));
    lines.push(format!("{}:", ASSISTANT_LABEL));

    lines.join("\n")
}

/// Accept whatever the caller sent as `conversationHistory`; anything but an array is empty.
pub fn history_entries(raw: Option<&Value>) -> &[Value] {
    raw.and_then(|v| v.as_array())
        .map(|arr| arr.as_slice())
        .unwrap_or(&[])
}

fn render_turn(entry: &Value) -> Option<String> {
    let obj = entry.as_object()?;
    let content = obj.get("content").and_then(|v| v.as_str())?;
    if content.trim().is_empty() {
        return None;
    }

    match obj.get("role").and_then(|v| v.as_str()) {
        Some("user") => Some(format!("{}: {}", USER_LABEL, content)),
        Some("assistant") => Some(format!("{}: {}", ASSISTANT_LABEL, content)),
        _ => None,
    }
}
