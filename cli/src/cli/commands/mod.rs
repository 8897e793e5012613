pub mod ask;
pub mod start;
pub mod status;

use std::path::PathBuf;

use lia_core::config::{expand_path, load_config, Config};
use lia_core::prompt::load_system_prompt;
use lia_core::proxy::InferenceClient;

/// Config file plus environment overrides
pub fn effective_config(config_path: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = load_config(config_path)?;
    config.apply_env_overrides();
    Ok(config)
}

pub fn build_client(config: &Config) -> anyhow::Result<InferenceClient> {
    let prompt_file = config.prompt.file.as_ref().map(expand_path);
    let system_prompt = load_system_prompt(prompt_file.as_deref())?;
    InferenceClient::new(config.inference.clone(), system_prompt)
}
