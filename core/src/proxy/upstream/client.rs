//! Upstream client for calling the LM Studio chat endpoint

use std::future::Future;

use reqwest::{header, Client};
use serde_json::Value;
use tokio::time::Duration;

use crate::proxy::config::ProxyConfig;
use crate::proxy::errors::{InferenceError, TransportError};
use crate::proxy::mappers::history::{build_input, ChatPayload, ConversationTurn};
use crate::proxy::mappers::response::extract_reply;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_millis(5000);
const PREVIEW_CHARS: usize = 50;

/// Client for the downstream inference endpoint.
///
/// Built once at startup and shared by handle; holds no per-call state, so
/// concurrent chats never interfere.
#[derive(Clone)]
pub struct InferenceClient {
    http_client: Client,
    config: ProxyConfig,
    system_prompt: String,
}

impl InferenceClient {
    pub fn new(config: ProxyConfig, system_prompt: String) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout())
            .user_agent(concat!("lia-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            config,
            system_prompt,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the request body for one chat call
    pub fn build_payload(&self, user_message: &str, history: &[Value]) -> ChatPayload {
        ChatPayload {
            model: self.config.model.clone(),
            system_prompt: self.system_prompt.clone(),
            input: build_input(user_message, history, self.config.max_history_messages),
        }
    }

    /// Send a user message with its (unvalidated) history and return the reply text.
    pub async fn chat(&self, user_message: &str, history: &[Value]) -> Result<String, InferenceError> {
        let payload = self.build_payload(user_message, history);

        tracing::info!(
            "Sending request to LM Studio (timeout {}ms, up to {} attempts): \"{}\"",
            self.config.timeout_ms,
            self.config.attempt_budget(),
            preview(user_message)
        );
        tracing::info!("History: {} previous messages", history.len());

        let body = self.send_with_retry(&payload).await.map_err(|e| {
            tracing::error!("Inference request failed: {}", e);
            e.classify(&self.config.base_url)
        })?;

        let reply = extract_reply(&body);
        tracing::info!("Reply received: \"{}\"", preview(&reply));

        Ok(reply)
    }

    /// Typed-history convenience over [`InferenceClient::chat`]
    pub async fn chat_turns(&self, user_message: &str, history: &[ConversationTurn]) -> Result<String, InferenceError> {
        let values: Vec<Value> = history.iter().map(ConversationTurn::to_value).collect();
        self.chat(user_message, &values).await
    }

    async fn send_with_retry(&self, payload: &ChatPayload) -> Result<Value, TransportError> {
        retry_on_timeout(self.config.max_retries, |_| self.send_once(payload)).await
    }

    async fn send_once(&self, payload: &ChatPayload) -> Result<Value, TransportError> {
        let response = self.http_client
            .post(&self.config.base_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(TransportError::from_reqwest)?;

        if !status.is_success() {
            tracing::error!("Upstream error {}: {}", status, text);
            return Err(TransportError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: if text.is_empty() { None } else { Some(parse_body(&text)) },
            });
        }

        Ok(parse_body(&text))
    }

    /// Whether the inference service answers at all. Never fails.
    pub async fn health_check(&self) -> bool {
        let url = self.config.health_url();
        match self.http_client.get(url).timeout(HEALTH_CHECK_TIMEOUT).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::debug!("Health check {} returned {}", url, resp.status());
                false
            }
            Err(e) => {
                tracing::debug!("Health check {} failed: {}", url, e);
                false
            }
        }
    }
}

/// Run `op` until it succeeds, fails with a non-timeout error, or `max_retries`
/// retries have been spent. Retries are immediate; the last error is returned as-is.
pub async fn retry_on_timeout<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T, TransportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!("LM Studio timed out. Retrying ({}/{})...", attempt, max_retries);
            }
            Err(e) => return Err(e),
        }
    }
}

/// JSON when it parses, the raw text otherwise
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_two_timeouts_make_two_attempts() {
        let calls = Cell::new(0u32);
        let result: Result<(), _> = retry_on_timeout(1, |attempt| {
            calls.set(calls.get() + 1);
            async move { Err(TransportError::Timeout(format!("attempt {}", attempt + 1))) }
        })
        .await;

        assert_eq!(calls.get(), 2);
        assert_eq!(result, Err(TransportError::Timeout("attempt 2".to_string())));
    }

    #[tokio::test]
    async fn test_timeout_then_success() {
        let calls = Cell::new(0u32);
        let result = retry_on_timeout(1, |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt == 0 {
                    Err(TransportError::Timeout("slow".to_string()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(calls.get(), 2);
        assert_eq!(result, Ok("ok"));
    }

    #[tokio::test]
    async fn test_non_timeout_fails_fast() {
        let calls = Cell::new(0u32);
        let result: Result<(), _> = retry_on_timeout(3, |_| {
            calls.set(calls.get() + 1);
            async { Err(TransportError::Connect("refused".to_string())) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert_eq!(result, Err(TransportError::Connect("refused".to_string())));
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let calls = Cell::new(0u32);
        let result: Result<(), _> = retry_on_timeout(0, |_| {
            calls.set(calls.get() + 1);
            async { Err(TransportError::Timeout("slow".to_string())) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_payload() {
        let client = InferenceClient::new(ProxyConfig::default(), "Eres LIA.".to_string()).unwrap();
        let history = vec![json!({"role": "assistant", "content": "Hola"})];
        let payload = client.build_payload("¿Cuál es tu nombre?", &history);

        assert_eq!(payload.model, "google/gemma-3-1b");
        assert_eq!(payload.system_prompt, "Eres LIA.");
        assert_eq!(payload.input, "LIA: Hola\nUsuario: ¿Cuál es tu nombre?\nLIA:");

        let wire = serde_json::to_value(&payload).unwrap();
        let mut keys: Vec<&String> = wire.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, ["input", "model", "system_prompt"]);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(r#"{"response":"hi"}"#), json!({"response": "hi"}));
        assert_eq!(parse_body("plain reply"), json!("plain reply"));
        assert_eq!(parse_body(""), json!(""));
    }

    #[test]
    fn test_preview_is_char_safe() {
        let long = "ñ".repeat(60);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 53);
        assert!(p.ends_with("..."));
        assert_eq!(preview("corto"), "corto");
    }
}
