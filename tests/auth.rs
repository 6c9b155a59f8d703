use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use notion_proxy::auth::{authenticate, ExpectedToken};
use notion_proxy::config::AppConfig;
use notion_proxy::error::ProxyError;
use notion_proxy::routing::dispatch::dispatch_request;
use notion_proxy::state::AppState;
use serde_json::Value;

fn test_state() -> Arc<AppState> {
    let mut config = AppConfig::default();
    config.client_authentication.token = "client-key".to_string();
    config.notion.cookie = "token_v2=test-cookie".to_string();
    Arc::new(AppState::new(config).expect("build state"))
}

async fn send(
    state: Arc<AppState>,
    base_path: &str,
    method: &str,
    uri: &str,
    authorization: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    let request = builder.body(Body::empty()).expect("build request");
    dispatch_request(state, Arc::<str>::from(base_path), request)
        .await
        .expect("dispatch")
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[test]
fn test_authenticate_against_configured_token() {
    let expected = ExpectedToken::new("client-key");
    let mut headers = http::HeaderMap::new();
    headers.insert("authorization", "Bearer client-key".parse().unwrap());
    assert!(authenticate(&headers, &expected).is_ok());

    headers.insert("authorization", "Bearer client-kez".parse().unwrap());
    let err = authenticate(&headers, &expected).unwrap_err();
    assert!(matches!(err, ProxyError::Auth(_)));
}

#[tokio::test]
async fn test_chat_requires_bearer_token() {
    let state = test_state();

    let response = send(
        Arc::clone(&state),
        "",
        "POST",
        "/v1/chat/completions",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = json_body(response).await;
    assert_eq!(payload["error"]["message"], "Missing authentication credentials");
    assert_eq!(payload["error"]["type"], "unauthorized");

    let response = send(
        state,
        "",
        "POST",
        "/v1/chat/completions",
        Some("Bearer client-kez"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = json_body(response).await;
    assert_eq!(payload["error"]["message"], "Invalid authentication credentials");
}

#[tokio::test]
async fn test_models_listing_is_authenticated() {
    let state = test_state();

    let response = send(Arc::clone(&state), "", "GET", "/v1/models", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(state, "", "GET", "/v1/models", Some("Bearer client-key")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["object"], "list");
    let ids: Vec<&str> = payload["data"]
        .as_array()
        .expect("data")
        .iter()
        .map(|card| card["id"].as_str().expect("id"))
        .collect();
    assert_eq!(
        ids,
        ["openai-gpt-4.1", "anthropic-opus-4", "anthropic-sonnet-4"]
    );
    assert_eq!(payload["data"][0]["owned_by"], "notion");
}

#[tokio::test]
async fn test_health_needs_no_credentials_and_hides_secrets() {
    let state = test_state();
    let response = send(state, "", "GET", "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["status"], "notion-proxy is running");
    assert_eq!(payload["config"]["notion_cookie_configured"], true);
    assert_eq!(payload["config"]["notion_space_id_configured"], false);
    assert_eq!(payload["config"]["default_token_in_use"], false);
    assert!(!payload.to_string().contains("test-cookie"));
    assert!(!payload.to_string().contains("client-key"));
}

#[tokio::test]
async fn test_unknown_paths_and_methods() {
    let state = test_state();
    let auth = Some("Bearer client-key");

    let response = send(Arc::clone(&state), "", "GET", "/v1/chat/completions", auth).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = send(Arc::clone(&state), "", "POST", "/v1/embeddings", auth).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_base_path_prefix_is_honored() {
    let state = test_state();
    let auth = Some("Bearer client-key");

    let response = send(Arc::clone(&state), "/proxy", "GET", "/proxy/v1/models", auth).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(Arc::clone(&state), "/proxy", "GET", "/v1/models", auth).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(state, "/proxy", "GET", "/proxyv1/models", auth).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
