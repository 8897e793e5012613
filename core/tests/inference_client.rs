use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde_json::{json, Value};

use lia_core::proxy::mappers::response::UNRECOGNIZED_RESPONSE_PLACEHOLDER;
use lia_core::proxy::{ConversationTurn, InferenceClient, InferenceError, ProxyConfig};

const SYSTEM_PROMPT: &str = "Eres LIA, asistente de pruebas.";

/// Serve `router` on an ephemeral port and return the chat URL
async fn spawn_endpoint(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api/v1/chat", addr)
}

/// A URL nothing listens on
async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/v1/chat", addr)
}

fn client_for(base_url: &str, timeout_ms: u64, max_retries: u32) -> InferenceClient {
    let config = ProxyConfig {
        base_url: base_url.to_string(),
        timeout_ms,
        max_retries,
        ..ProxyConfig::default()
    };
    InferenceClient::new(config, SYSTEM_PROMPT.to_string()).unwrap()
}

#[tokio::test]
async fn chat_round_trips_openai_reply() {
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/api/v1/chat",
            post(|State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                received.lock().unwrap().push(body);
                Json(json!({"choices": [{"message": {"role": "assistant", "content": "Me llamo LIA."}}]}))
            }),
        )
        .with_state(received.clone());
    let url = spawn_endpoint(router).await;

    let client = client_for(&url, 5_000, 1);
    let reply = client.chat("¿Cuál es tu nombre?", &[]).await.unwrap();
    assert_eq!(reply, "Me llamo LIA.");

    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "model": "google/gemma-3-1b",
            "system_prompt": SYSTEM_PROMPT,
            "input": "Usuario: ¿Cuál es tu nombre?\nLIA:"
        })
    );
}

#[tokio::test]
async fn chat_turns_serializes_history_into_input() {
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/api/v1/chat",
            post(|State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                received.lock().unwrap().push(body);
                Json(json!({"output": [{"type": "message", "content": "De 8 a 5."}]}))
            }),
        )
        .with_state(received.clone());
    let url = spawn_endpoint(router).await;

    let client = client_for(&url, 5_000, 1);
    let history = vec![
        ConversationTurn::user("Hola"),
        ConversationTurn::assistant("Hola, ¿en qué te ayudo?"),
    ];
    let reply = client.chat_turns("¿Qué horario tienen?", &history).await.unwrap();
    assert_eq!(reply, "De 8 a 5.");

    let bodies = received.lock().unwrap();
    assert_eq!(
        bodies[0]["input"],
        "Usuario: Hola\nLIA: Hola, ¿en qué te ayudo?\nUsuario: ¿Qué horario tienen?\nLIA:"
    );
}

#[tokio::test]
async fn two_timeouts_make_exactly_two_attempts() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/api/v1/chat",
            post(|State(attempts): State<Arc<AtomicUsize>>| async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"response": "too late"}))
            }),
        )
        .with_state(attempts.clone());
    let url = spawn_endpoint(router).await;

    let client = client_for(&url, 200, 1);
    let err = client.chat("hola", &[]).await.unwrap_err();

    assert_eq!(err, InferenceError::Timeout);
    assert_eq!(err.to_string(), "request took too long, try again");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn timeout_then_success_returns_second_reply() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/api/v1/chat",
            post(|State(attempts): State<Arc<AtomicUsize>>| async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Json(json!({"response": "segundo intento"}))
            }),
        )
        .with_state(attempts.clone());
    let url = spawn_endpoint(router).await;

    let client = client_for(&url, 300, 1);
    let reply = client.chat("hola", &[]).await.unwrap();

    assert_eq!(reply, "segundo intento");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn http_error_is_not_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/api/v1/chat",
            post(|State(attempts): State<Arc<AtomicUsize>>| async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                (StatusCode::NOT_FOUND, Json(json!({"error": "model not found"})))
            }),
        )
        .with_state(attempts.clone());
    let url = spawn_endpoint(router).await;

    let client = client_for(&url, 5_000, 3);
    let err = client.chat("hola", &[]).await.unwrap_err();

    assert_eq!(
        err,
        InferenceError::Upstream { status: 404, message: "model not found".to_string() }
    );
    assert_eq!(err.to_string(), "404: model not found");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_error_body_uses_status_text() {
    let router = Router::new().route(
        "/api/v1/chat",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let url = spawn_endpoint(router).await;

    let err = client_for(&url, 5_000, 1).chat("hola", &[]).await.unwrap_err();
    assert_eq!(err.to_string(), "500: Internal Server Error");
}

#[tokio::test]
async fn connection_refused_reports_base_url() {
    let url = refused_url().await;
    let client = client_for(&url, 5_000, 1);

    let err = client.chat("hola", &[]).await.unwrap_err();
    assert!(matches!(err, InferenceError::ServiceUnavailable { .. }));
    assert!(err.to_string().contains(&url), "{}", err);
}

#[tokio::test]
async fn plain_text_body_is_returned_as_is() {
    let router = Router::new().route("/api/v1/chat", post(|| async { "respuesta en texto" }));
    let url = spawn_endpoint(router).await;

    let reply = client_for(&url, 5_000, 1).chat("hola", &[]).await.unwrap();
    assert_eq!(reply, "respuesta en texto");
}

#[tokio::test]
async fn unrecognized_shape_yields_placeholder() {
    let router = Router::new().route("/api/v1/chat", post(|| async { Json(json!({"foo": "bar"})) }));
    let url = spawn_endpoint(router).await;

    let reply = client_for(&url, 5_000, 1).chat("hola", &[]).await.unwrap();
    assert_eq!(reply, UNRECOGNIZED_RESPONSE_PLACEHOLDER);
}

#[tokio::test]
async fn health_check_uses_url_without_chat_suffix() {
    let router = Router::new().route("/api/v1", get(|| async { Json(json!({"data": []})) }));
    let url = spawn_endpoint(router).await;
    assert!(client_for(&url, 5_000, 1).health_check().await);

    let refused = refused_url().await;
    assert!(!client_for(&refused, 5_000, 1).health_check().await);
}
