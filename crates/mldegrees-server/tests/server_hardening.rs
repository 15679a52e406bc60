use std::net::SocketAddr;

use mldegrees_server::{build_router, ApiConfig, AppState};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn spawn_server(api: ApiConfig) -> SocketAddr {
    let conn = mldegrees_store::open_in_memory().expect("open in-memory store");
    let app = build_router(AppState::with_config(conn, api));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });
    addr
}

async fn send_raw(addr: SocketAddr, request: String) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    response
}

fn header_value(response: &str, name: &str) -> Option<String> {
    let (head, _) = response.split_once("\r\n\r\n").expect("header separator");
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.eq_ignore_ascii_case(name) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

fn cors_config() -> ApiConfig {
    ApiConfig {
        cors_allowed_origins: vec!["http://localhost:5173".to_string()],
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn preflight_grants_only_allowlisted_origins() {
    let addr = spawn_server(cors_config()).await;

    let request = format!(
        "OPTIONS /api/programs HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://localhost:5173\r\nAccess-Control-Request-Method: POST\r\nConnection: close\r\n\r\n"
    );
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert_eq!(
        header_value(&response, "access-control-allow-origin"),
        Some("http://localhost:5173".to_string())
    );
    let methods = header_value(&response, "access-control-allow-methods").expect("methods header");
    assert!(methods.contains("POST"));
    assert!(methods.contains("DELETE"));

    let request = format!(
        "OPTIONS /api/programs HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://evil.example\r\nAccess-Control-Request-Method: POST\r\nConnection: close\r\n\r\n"
    );
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert_eq!(header_value(&response, "access-control-allow-origin"), None);
}

#[tokio::test]
async fn cross_origin_responses_echo_the_allowed_origin() {
    let addr = spawn_server(cors_config()).await;

    let request = format!(
        "GET /api/programs HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://localhost:5173\r\nConnection: close\r\n\r\n"
    );
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(
        header_value(&response, "access-control-allow-origin"),
        Some("http://localhost:5173".to_string())
    );
    assert_eq!(
        header_value(&response, "vary"),
        Some("Origin".to_string())
    );

    let request = format!(
        "GET /api/programs HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://evil.example\r\nConnection: close\r\n\r\n"
    );
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header_value(&response, "access-control-allow-origin"), None);
}

#[tokio::test]
async fn local_auth_is_absent_unless_enabled() {
    let addr = spawn_server(ApiConfig::default()).await;

    let payload = json!({ "role": "admin" }).to_string();
    let request = format!(
        "POST /api/auth/local HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    let (_, body) = response.split_once("\r\n\r\n").expect("header separator");
    let body: Value = serde_json::from_str(body.trim()).expect("json body");
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["details"]["resource"], "local auth");
}

#[tokio::test]
async fn metrics_report_served_requests() {
    let addr = spawn_server(ApiConfig::default()).await;

    let request =
        format!("GET /api/programs HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));

    let request = format!("GET /metrics HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("mldegrees_http_requests_total"));
    assert!(response.contains("route=\"/api/programs\",status=\"200\"} 1"));
    assert!(response.contains("mldegrees_sqlite_query_latency_p95_seconds"));
}

#[tokio::test]
async fn oversized_bodies_are_rejected_with_the_envelope() {
    let api = ApiConfig {
        max_body_bytes: 256,
        ..ApiConfig::default()
    };
    let addr = spawn_server(api).await;

    let payload = json!({
        "email": "padded@example.edu",
        "name": "x".repeat(1024),
        "google_id": "g-1",
    })
    .to_string();
    let request = format!(
        "POST /api/auth HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let response = send_raw(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    let (_, body) = response.split_once("\r\n\r\n").expect("header separator");
    let body: Value = serde_json::from_str(body.trim()).expect("json body");
    assert_eq!(body["error"]["code"], "validation_failed");
}
