use std::path::PathBuf;
use std::sync::Arc;

use lia_core::proxy::ProxyServer;

pub async fn run(config_path: Option<PathBuf>, port_override: Option<u16>) -> anyhow::Result<()> {
    // Load configuration
    let mut config = super::effective_config(config_path)?;

    // Apply port override if provided
    if let Some(port) = port_override {
        config.server.port = port;
    }

    tracing::info!("Starting LIA proxy...");
    tracing::info!("  Mode: {:?}", config.server.environment);
    tracing::info!("  LM Studio URL: {}", config.inference.base_url);
    tracing::info!("  Model: {}", config.inference.model);
    tracing::info!(
        "  Timeout: {}ms, attempts per message: {}, history window: {}",
        config.inference.timeout_ms,
        config.inference.attempt_budget(),
        config.inference.max_history_messages
    );

    let client = Arc::new(super::build_client(&config)?);

    if !client.health_check().await {
        tracing::warn!("LM Studio is not reachable at {} yet.", client.config().health_url());
        tracing::warn!("The server will start but chat requests will fail until it is running.");
    }

    let server = ProxyServer::new(config.server.clone(), client, config.business.clone());

    tracing::info!("Proxy server starting on http://{}:{}", config.server.host, config.server.port);
    tracing::info!("Press Ctrl+C to stop");

    // Run server (blocks until shutdown)
    server.run().await?;

    Ok(())
}
