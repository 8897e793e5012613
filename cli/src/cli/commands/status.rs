use std::path::PathBuf;

use lia_core::config::default_config_path;

pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::effective_config(config_path)?;

    println!("LIA Proxy Status");
    println!("================");
    println!();
    println!("Configuration:");
    println!("  Config file: {:?}", default_config_path());
    println!("  Mode: {:?}", config.server.environment);
    println!();
    println!("Server settings:");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!();
    println!("Inference:");
    println!("  URL: {}", config.inference.base_url);
    println!("  Model: {}", config.inference.model);
    println!("  Timeout: {}ms", config.inference.timeout_ms);
    println!("  Max retries: {}", config.inference.max_retries);
    println!("  History window: {} messages", config.inference.max_history_messages);
    match &config.prompt.file {
        Some(path) => println!("  System prompt: {:?}", path),
        None => println!("  System prompt: built-in"),
    }

    // Check if server is reachable
    println!();
    let url = format!("http://{}:{}/api/health", config.server.host, config.server.port);
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            println!("Server: RUNNING ✓");
        }
        _ => {
            println!("Server: NOT RUNNING");
        }
    }

    let client = super::build_client(&config)?;
    if client.health_check().await {
        println!("LM Studio: CONNECTED ✓");
    } else {
        println!("LM Studio: DISCONNECTED ({})", client.config().health_url());
    }

    Ok(())
}
