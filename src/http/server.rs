//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, timeout)
//! - Dispatch each request: streaming upgrade or plain forward
//! - Bind the server to a listener and run it
//!
//! # Design Decisions
//! - Dispatch keys off the `Upgrade` header, case-insensitively
//! - CORS (including preflight) is handled by a permissive layer so browser
//!   clients can reach the relay directly
//! - The request timeout applies to plain calls only in effect: a streaming
//!   upgrade response is produced immediately and the upgraded connection
//!   is not subject to it

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ws::rejection::WebSocketUpgradeRejection,
    extract::{State, WebSocketUpgrade},
    http::{header, HeaderMap, Request},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::{forward, websocket};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub http: reqwest::Client,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .build()
            .expect("failed to build upstream HTTP client");

        let state = AppState {
            config: Arc::new(config.clone()),
            http,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(relay_handler))
            .route("/", any(relay_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Dispatch: streaming upgrade or plain forward.
async fn relay_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request<Body>,
) -> Response {
    if is_websocket_upgrade(request.headers()) {
        if let Ok(upgrade) = ws {
            return websocket::handle_upgrade(
                &state,
                upgrade,
                request.headers(),
                request.uri().query(),
            );
        }
        tracing::debug!("upgrade header present but handshake incomplete, forwarding as plain");
    }

    forward::proxy_request(&state, request).await
}

/// A streaming upgrade is detected by an `Upgrade` header case-insensitively
/// equal to `websocket`.
fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
