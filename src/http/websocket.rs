//! WebSocket upgrade handling.
//!
//! # Responsibilities
//! - Negotiate the sub-protocol from the client's offer
//! - Build the credential-injected upstream streaming URL
//! - Complete the upgrade handshake and hand the socket to the relay
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Relay ←──── WebSocket frames ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - The negotiated token is applied to both the upgrade response and the
//!   upstream connect request, or to neither
//! - The client's query string is forwarded to the upstream URL as-is

use axum::extract::WebSocketUpgrade;
use axum::http::{header, HeaderMap};
use axum::response::Response;

use crate::http::server::AppState;
use crate::relay;
use crate::upstream;

/// Accept a streaming upgrade and start a relay session.
pub fn handle_upgrade(
    state: &AppState,
    ws: WebSocketUpgrade,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Response {
    let offer = headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok());
    let protocol = relay::negotiate(offer);

    let url = upstream::streaming_url(
        &state.config.upstream.ws_url,
        query,
        &state.config.upstream.api_key,
    );
    let heartbeat = state.config.heartbeat.clone();

    let ws = match &protocol {
        Some(token) => ws.protocols([token.clone()]),
        None => ws,
    };

    ws.on_upgrade(move |socket| relay::relay_session(socket, url, protocol, heartbeat))
}
