//! Proxy Server - Axum HTTP server for the chat API

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{BusinessConfig, Environment, ServerConfig};
use crate::proxy::handlers::{self, ApiError};
use crate::proxy::InferenceClient;

const BODY_LIMIT_BYTES: usize = 10 * 1024;
const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<InferenceClient>,
    pub business: Arc<BusinessConfig>,
}

/// Proxy server instance
pub struct ProxyServer {
    config: ServerConfig,
    state: AppState,
}

impl ProxyServer {
    pub fn new(config: ServerConfig, client: Arc<InferenceClient>, business: BusinessConfig) -> Self {
        let state = AppState {
            client,
            business: Arc::new(business),
        };

        Self { config, state }
    }

    /// Build the router without binding a socket
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(health_check_handler))
            .route("/api/chat/message", post(handlers::chat::handle_send_message))
            .route("/api/chat/status", get(handlers::chat::handle_status))
            .route("/api/chat/config", get(handlers::chat::handle_config))
            .fallback(not_found_handler)
            .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
            .layer(cors_layer(&self.config))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the proxy server (blocking)
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("Proxy server listening on {}", addr);

        // Handle graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

/// Origins allowed to call the API
pub fn allowed_origins(config: &ServerConfig) -> Vec<String> {
    match config.environment {
        Environment::Production => config.frontend_url.iter().cloned().collect(),
        Environment::Development => DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins(config)
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("No CORS origin configured; browser requests will be rejected");
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Health check handler
async fn health_check_handler() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "timestamp": handlers::timestamp(),
            "service": "Voice Assistant API"
        })),
    )
        .into_response()
}

async fn not_found_handler() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "route not found")
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
