//! Streaming session relay subsystem.
//!
//! # Data Flow
//! ```text
//! client WebSocket (accepted)          upstream WebSocket (connecting)
//!        │ read half                          │ read half
//!        ▼                                    ▼
//!   pump_client ──── typed events ──── pump_upstream
//!                        │
//!                        ▼
//!              session control loop ◄── heartbeat ticks
//!                (owns both sinks)
//! ```
//!
//! # Design Decisions
//! - The client side is accepted before any upstream activity; the upstream
//!   connects in the background and announces itself with an event
//! - No connect timeout: if the upstream never opens, the session idles and
//!   client frames are dropped
//! - A session that ends while the upstream is still connecting closes the
//!   late-arriving socket instead of leaking it

pub mod heartbeat;
pub mod link;
pub mod negotiate;
pub mod session;

pub use negotiate::negotiate;

use axum::extract::ws::WebSocket;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::ClientRequestBuilder;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::config::HeartbeatConfig;
use crate::error::RelayError;
use crate::observability::metrics;
use link::{pump_client, pump_upstream, ClientLink, RelayLink, UpstreamLink};
use session::{SessionEvent, SideEvent};

/// Bridge one accepted client socket to the upstream endpoint.
///
/// Returns once the session reaches a terminal state. The upstream URL must
/// already carry the injected credential; `protocol` is the negotiated
/// sub-protocol, applied to the upstream handshake.
pub async fn relay_session(
    client: WebSocket,
    upstream_url: String,
    protocol: Option<String>,
    heartbeat: HeartbeatConfig,
) {
    let session_id = Uuid::new_v4().to_string();
    tracing::info!(session_id = %session_id, protocol = ?protocol, "streaming session started");
    metrics::record_session_opened();

    let (client_sink, client_stream) = client.split();
    let (tx, rx) = mpsc::channel::<SessionEvent<UpstreamLink>>(64);

    tokio::spawn(pump_client(client_stream, tx.clone()));

    let connector_tx = tx.clone();
    let connector_id = session_id.clone();
    tokio::spawn(async move {
        match open_upstream(&upstream_url, protocol.as_deref()).await {
            Ok(stream) => {
                let (sink, read) = stream.split();
                let open = SessionEvent::UpstreamOpen(UpstreamLink::new(sink));
                match connector_tx.send(open).await {
                    Ok(()) => pump_upstream(read, connector_tx).await,
                    Err(mpsc::error::SendError(SessionEvent::UpstreamOpen(mut upstream))) => {
                        // Session ended while the upstream was connecting;
                        // don't leak the half-open socket.
                        upstream
                            .close(session::CLOSE_NORMAL, session::REASON_CLIENT_CLOSED)
                            .await;
                    }
                    Err(_) => {}
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %connector_id, error = %e, "upstream connect failed");
                let _ = connector_tx
                    .send(SessionEvent::Upstream(SideEvent::Error))
                    .await;
            }
        }
    });

    session::run(
        session_id.clone(),
        ClientLink::new(client_sink),
        rx,
        tx,
        &heartbeat,
    )
    .await;

    metrics::record_session_ended();
    tracing::info!(session_id = %session_id, "streaming session ended");
}

async fn open_upstream(
    url: &str,
    protocol: Option<&str>,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, RelayError> {
    let mut request = ClientRequestBuilder::new(url.parse()?);
    if let Some(protocol) = protocol {
        request = request.with_sub_protocol(protocol);
    }
    let (stream, _response) = connect_async(request).await?;
    Ok(stream)
}
