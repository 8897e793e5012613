use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::proxy::ProxyConfig;

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub inference: ProxyConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub business: BusinessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub environment: Environment,

    /// Only origin allowed by CORS in production
    #[serde(default)]
    pub frontend_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            environment: Environment::default(),
            frontend_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptConfig {
    /// Replaces the built-in system prompt when set
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Public business details exposed by `/api/chat/config`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessConfig {
    #[serde(default = "default_business_name")]
    pub name: String,

    #[serde(default = "default_business_language")]
    pub language: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: default_business_name(),
            language: default_business_language(),
        }
    }
}

// Default value functions
fn default_port() -> u16 { 5000 }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_business_name() -> String { "Mi Negocio".to_string() }
fn default_business_language() -> String { "español".to_string() }

impl Config {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Blank values are ignored. Numeric values that fail to parse are logged and
    /// leave the current value in place. A zero timeout or history window falls back
    /// to the default; zero retries is honored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT").and_then(|v| parse_var::<u16>("PORT", &v)) {
            self.server.port = port;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(env) = get("APP_ENV") {
            match env.parse() {
                Ok(env) => self.server.environment = env,
                Err(e) => tracing::warn!("Ignoring APP_ENV: {}", e),
            }
        }
        if let Some(url) = get("FRONTEND_URL") {
            self.server.frontend_url = Some(url);
        }

        if let Some(url) = get("LM_STUDIO_URL") {
            self.inference.base_url = url;
        }
        if let Some(model) = get("LM_STUDIO_MODEL") {
            self.inference.model = model;
        }
        if let Some(ms) = get("LM_STUDIO_TIMEOUT_MS").and_then(|v| parse_var::<u64>("LM_STUDIO_TIMEOUT_MS", &v)) {
            self.inference.timeout_ms = ms;
        }
        if let Some(retries) = get("LM_STUDIO_MAX_RETRIES").and_then(|v| parse_var::<u32>("LM_STUDIO_MAX_RETRIES", &v)) {
            self.inference.max_retries = retries;
        }
        if let Some(n) = get("LM_STUDIO_MAX_HISTORY_MESSAGES")
            .and_then(|v| parse_var::<usize>("LM_STUDIO_MAX_HISTORY_MESSAGES", &v))
        {
            self.inference.max_history_messages = n;
        }

        if let Some(path) = get("LIA_SYSTEM_PROMPT_FILE") {
            self.prompt.file = Some(PathBuf::from(path));
        }

        if let Some(name) = get("BUSINESS_NAME") {
            self.business.name = name;
        }
        if let Some(language) = get("BUSINESS_LANGUAGE") {
            self.business.language = language;
        }

        self.inference.normalize();
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid number", key, value);
            None
        }
    }
}

/// Get default config file path
/// Uses ~/.config/lia-proxy/config.toml for Unix-like CLI experience
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("lia-proxy")
        .join("config.toml")
}

/// Load config from file, or return defaults if not found.
///
/// Loading order:
/// 1. Specified path (if provided)
/// 2. ./config.toml (if exists)
/// 3. default_config_path() (usually ~/.config/lia-proxy/config.toml)
///
/// Zero timeout and history values are replaced by their defaults. Environment
/// overrides are applied on top by the caller via [`Config::apply_env_overrides`].
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = read_config(path)?;
    config.inference.normalize();
    Ok(config)
}

fn read_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    if let Some(config_path) = path {
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::info!("Loaded config from specified path {:?}", config_path);
            return Ok(config);
        } else {
            anyhow::bail!("Specified config file not found: {:?}", config_path);
        }
    }

    // Try current directory config.toml
    let local_config = PathBuf::from("config.toml");
    if local_config.exists() {
        match std::fs::read_to_string(&local_config) {
            Ok(content) => {
                match toml::from_str::<Config>(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from current directory {:?}", local_config);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse ./config.toml: {}. Falling back to default path.", e);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to read ./config.toml: {}. Falling back to default path.", e);
            }
        }
    }

    let default_path = default_config_path();
    if default_path.exists() {
        let content = std::fs::read_to_string(&default_path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::info!("Loaded config from default path {:?}", default_path);
        Ok(config)
    } else {
        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }
}

/// Expand ~ in path to home directory
pub fn expand_path(path: &PathBuf) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.clone()
}
