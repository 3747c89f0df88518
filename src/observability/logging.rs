//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Honor `RUST_LOG` with a config-driven fallback
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - The environment always wins over the config file

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `default_level` is used when `RUST_LOG` is not set, e.g. `"info"`.
pub fn init_logging(default_level: &str) {
    let fallback = format!("rpc_relay={default_level},tower_http=warn");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
