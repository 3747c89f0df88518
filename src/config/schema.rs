//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the RPC relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream RPC service endpoints and credential.
    pub upstream: UpstreamConfig,

    /// Upstream keepalive settings for streaming sessions.
    pub heartbeat: HeartbeatConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream RPC service configuration.
///
/// The relay talks to exactly one upstream. The API key is appended to every
/// outbound URL as an `api-key` query parameter and is never exposed to the
/// client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// HTTP endpoint for plain JSON-RPC calls.
    pub rpc_url: String,

    /// WebSocket endpoint for streaming sessions.
    pub ws_url: String,

    /// Access key injected into upstream URLs. May be overridden by the
    /// `RELAY_API_KEY` environment variable at load time.
    pub api_key: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.helius-rpc.com".to_string(),
            ws_url: "wss://mainnet.helius-rpc.com".to_string(),
            api_key: String::new(),
        }
    }
}

/// Keepalive settings for the upstream side of streaming sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between keepalive messages.
    pub interval_secs: u64,

    /// Payload sent on each tick. The default is the literal notification
    /// the hosted Helius endpoint expects.
    pub payload: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            payload: r#"{"jsonrpc":"2.0","method":"helius_keepalive"}"#.to_string(),
        }
    }
}

/// Timeout configuration for plain (non-streaming) forwarding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Streaming sessions are never subject to this timeout.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
