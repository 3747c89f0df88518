//! Credential-injecting RPC relay library.
//!
//! Sits between a client and a single upstream JSON-RPC service, forwarding
//! plain calls and persistent WebSocket sessions while injecting an access
//! key the client never sees.

pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod relay;
pub mod upstream;

pub use config::RelayConfig;
pub use error::RelayError;
pub use http::HttpServer;
