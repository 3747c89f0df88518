//! Plain request/response forwarding.
//!
//! # Responsibilities
//! - Forward a single non-streaming call to the upstream RPC endpoint
//! - Inject the credential into the upstream URL
//! - Tag the outbound request with a marker header identifying the proxy
//! - Pass the upstream status and body through unchanged
//!
//! # Design Decisions
//! - The client's query string is carried through byte-for-byte
//! - Hop-by-hop headers are stripped before forwarding
//! - Upstream transport failures map to 502, never to a process fault

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::upstream;

/// Marker header attached to every forwarded request.
pub const X_RPC_RELAY: &str = "x-rpc-relay";

/// Largest request body the relay will buffer for forwarding.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Headers that must not be forwarded to the upstream.
const HOP_BY_HOP: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Forward one plain call to the upstream RPC endpoint.
pub async fn proxy_request(state: &AppState, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    let url = upstream::rpc_url(
        &state.config.upstream.rpc_url,
        parts.uri.query(),
        &state.config.upstream.api_key,
    );

    let result = state
        .http
        .request(parts.method.clone(), &url)
        .headers(outbound_headers(&parts.headers))
        .body(body_bytes)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "upstream request failed");
            metrics::record_request(StatusCode::BAD_GATEWAY.as_u16());
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    metrics::record_request(status.as_u16());

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to read upstream response body");
            return (StatusCode::BAD_GATEWAY, "Upstream response failed").into_response();
        }
    };

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from(bytes))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

/// Copy the client's headers for the upstream call, dropping hop-by-hop
/// headers and adding the proxy marker.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in inbound.iter() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        headers.insert(name.clone(), value.clone());
    }
    headers.insert(X_RPC_RELAY, HeaderValue::from_static("true"));
    headers
}
