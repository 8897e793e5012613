//! Inference proxy configuration
//! Process-wide settings for the downstream LM Studio endpoint

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/api/v1/chat";
pub const DEFAULT_MODEL: &str = "google/gemma-3-1b";

/// Downstream endpoint configuration, loaded once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-attempt request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts made after a timeout. Other failures are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// How many trailing history entries are serialized into the prompt
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            max_history_messages: default_max_history_messages(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total attempts allowed for one chat call
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Replace a zero timeout or history window with its default.
    /// A zero timeout would fail every call and a zero window would drop all history.
    pub fn normalize(&mut self) {
        if self.timeout_ms == 0 {
            tracing::warn!("timeout_ms = 0 is not usable, using {}ms", default_timeout_ms());
            self.timeout_ms = default_timeout_ms();
        }
        if self.max_history_messages == 0 {
            tracing::warn!("max_history_messages = 0 is not usable, using {}", default_max_history_messages());
            self.max_history_messages = default_max_history_messages();
        }
    }

    /// URL the health check hits: the base URL without its `/chat` suffix
    pub fn health_url(&self) -> &str {
        self.base_url
            .strip_suffix("/chat")
            .unwrap_or(&self.base_url)
    }
}

pub(crate) fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
pub(crate) fn default_model() -> String { DEFAULT_MODEL.to_string() }
pub(crate) fn default_timeout_ms() -> u64 { 120_000 }
pub(crate) fn default_max_retries() -> u32 { 1 }
pub(crate) fn default_max_history_messages() -> usize { 12 }
