//! Shared utilities for integration testing.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use rpc_relay::config::RelayConfig;
use rpc_relay::http::HttpServer;

/// A relay config pointing at local mock upstreams, with metrics disabled.
pub fn test_config(rpc_addr: Option<SocketAddr>, ws_addr: Option<SocketAddr>) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream.api_key = "test-key".to_string();
    config.observability.metrics_enabled = false;
    if let Some(addr) = rpc_addr {
        config.upstream.rpc_url = format!("http://{}", addr);
    }
    if let Some(addr) = ws_addr {
        config.upstream.ws_url = format!("ws://{}/", addr);
    }
    config
}

/// Start the relay on an ephemeral port and return its address.
pub async fn spawn_relay(config: RelayConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}
