//! Relay error types.
//!
//! Errors here cover the session *setup* path (building the upstream request,
//! completing the upstream handshake). Steady-state failures never propagate
//! to a caller: they surface to the client only as WebSocket close codes.

use thiserror::Error;

/// Errors raised while establishing the upstream side of a session.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),

    #[error("upstream connect failed: {0}")]
    UpstreamConnect(#[from] tokio_tungstenite::tungstenite::Error),
}
