//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, upgrade detection, dispatch)
//!     → websocket.rs (streaming upgrade → relay session)
//!       or
//!     → forward.rs (plain call → single upstream request)
//! ```

pub mod forward;
pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
