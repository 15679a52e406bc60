// SPDX-License-Identifier: Apache-2.0

use crate::*;

/// The resolved caller, attached to every request. `None` is a real state:
/// anonymous requests read the public catalog; protected handlers turn it
/// into 401.
#[derive(Clone, Debug, Default)]
pub(crate) struct RequestIdentity(pub(crate) Option<User>);

pub(crate) fn normalized_header_value(
    headers: &HeaderMap,
    name: &str,
    max_len: usize,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= max_len)
        .map(ToString::to_string)
}

/// Pulls the token out of `Authorization: Bearer {token}`. The token is the
/// provider subject issued at sign-in; anything else is treated as absent.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = normalized_header_value(headers, "authorization", 512)?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    let raw = normalized_header_value(headers, "x-forwarded-for", 256)?;
    raw.split(',').next().map(|ip| ip.trim().to_string())
}

/// Resolves the bearer token to a user row and stashes the result on the
/// request. Unknown or unreadable tokens fall through to anonymous; the
/// decision to reject is per-handler, not global.
pub(crate) async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = match bearer_token(req.headers()) {
        Some(token) => {
            let started = Instant::now();
            let conn = state.db.lock().await;
            let found = find_user_by_subject(&conn, &token);
            drop(conn);
            state
                .metrics
                .observe_sqlite_query("identity_lookup", started.elapsed())
                .await;
            found.ok().flatten()
        }
        None => None,
    };
    req.extensions_mut().insert(RequestIdentity(identity));
    next.run(req).await
}

pub(crate) async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = normalized_header_value(req.headers(), "origin", 256);
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        if let Some(origin_value) = origin {
            if state
                .api
                .cors_allowed_origins
                .iter()
                .any(|x| x == &origin_value)
            {
                if let Ok(v) = HeaderValue::from_str(&origin_value) {
                    resp.headers_mut().insert("access-control-allow-origin", v);
                }
                resp.headers_mut().insert(
                    "access-control-allow-methods",
                    HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
                );
                resp.headers_mut().insert(
                    "access-control-allow-headers",
                    HeaderValue::from_static("authorization,content-type,x-request-id"),
                );
            }
        }
        return resp;
    }

    let mut resp = next.run(req).await;
    if let Some(origin_value) = origin {
        if state
            .api
            .cors_allowed_origins
            .iter()
            .any(|x| x == &origin_value)
        {
            if let Ok(v) = HeaderValue::from_str(&origin_value) {
                resp.headers_mut().insert("access-control-allow-origin", v);
            }
            resp.headers_mut()
                .insert("vary", HeaderValue::from_static("Origin"));
        }
    }
    resp
}

pub(crate) async fn request_log_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let incoming_id =
        normalized_header_value(req.headers(), "x-request-id", 128).unwrap_or_default();
    let client_ip = forwarded_client_ip(req.headers()).unwrap_or_else(|| "unknown".to_string());
    let resp = next.run(req).await;
    if state.api.enable_request_log && path != "/api/health" {
        // Handlers stamp the response with the id they settled on; the
        // incoming header is only a fallback for unrouted requests.
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or(incoming_id.as_str());
        info!(
            target: "mldegrees_audit",
            method = %method,
            path = %path,
            status = resp.status().as_u16(),
            request_id = %request_id,
            client_ip = %client_ip,
            latency_ms = started.elapsed().as_millis() as u64,
            "request"
        );
    }
    resp
}
