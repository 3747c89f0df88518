//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_opened_total` (counter): streaming sessions accepted
//! - `relay_sessions_closed_total` (counter): terminal events by initiating side
//! - `relay_active_sessions` (gauge): currently live streaming sessions
//! - `relay_messages_forwarded_total` (counter): frames by direction
//! - `relay_requests_total` (counter): plain forwarded calls by status
//!
//! # Design Decisions
//! - Prometheus exporter on its own listener, separate from proxy traffic
//! - Recording is a no-op until the exporter is installed, so library code
//!   can record unconditionally

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

/// A streaming session was accepted.
pub fn record_session_opened() {
    counter!("relay_sessions_opened_total").increment(1);
    gauge!("relay_active_sessions").increment(1.0);
}

/// A streaming session finished tearing down.
pub fn record_session_ended() {
    gauge!("relay_active_sessions").decrement(1.0);
}

/// A session hit a terminal event; `side` is the side that triggered it.
pub fn record_session_closed(side: &'static str) {
    counter!("relay_sessions_closed_total", "side" => side).increment(1);
}

/// One frame was forwarded in the given direction.
pub fn record_forward(direction: &'static str) {
    counter!("relay_messages_forwarded_total", "direction" => direction).increment(1);
}

/// One plain request/response call completed with the given status.
pub fn record_request(status: u16) {
    counter!("relay_requests_total", "status" => status.to_string()).increment(1);
}
