//! Transport adapters for the two sides of a session.
//!
//! The session control loop is written against the [`RelayLink`] trait so the
//! state machine can be exercised with mock transports in tests. The concrete
//! adapters wrap the write half of each connection: [`ClientLink`] for the
//! axum WebSocket accepted from the client, [`UpstreamLink`] for the
//! tokio-tungstenite stream opened toward the upstream service. The matching
//! read halves are drained by the pump functions, which translate raw frames
//! into typed session events.

use axum::extract::ws;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::relay::session::{CloseInfo, Frame, SessionEvent, SideEvent};

/// Marker for a failed send; the link logs the underlying transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendFailed;

/// One side of a session as seen by the control loop.
///
/// `close` must tolerate the peer already being closed: multiple event
/// sources may race to tear down the same side, and every attempt after the
/// first has to be a no-op rather than an error.
#[allow(async_fn_in_trait)]
pub trait RelayLink {
    /// Forward one application frame. Failure is fatal for this direction.
    async fn send(&mut self, frame: Frame) -> Result<(), SendFailed>;

    /// Initiate a close handshake with the given code and reason.
    async fn close(&mut self, code: u16, reason: &str);
}

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the client-side connection.
pub struct ClientLink {
    sink: SplitSink<ws::WebSocket, ws::Message>,
}

impl ClientLink {
    pub fn new(sink: SplitSink<ws::WebSocket, ws::Message>) -> Self {
        Self { sink }
    }
}

impl RelayLink for ClientLink {
    async fn send(&mut self, frame: Frame) -> Result<(), SendFailed> {
        let message = match frame {
            Frame::Text(text) => ws::Message::Text(text.into()),
            Frame::Binary(bytes) => ws::Message::Binary(bytes.into()),
        };
        self.sink.send(message).await.map_err(|e| {
            tracing::warn!(error = %e, "client-side send failed");
            SendFailed
        })
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let frame = ws::CloseFrame {
            code,
            reason: reason.to_owned().into(),
        };
        if let Err(e) = self.sink.send(ws::Message::Close(Some(frame))).await {
            // Already closed; the race is expected.
            tracing::debug!(error = %e, "client-side close was a no-op");
        }
    }
}

/// Write half of the upstream-side connection.
pub struct UpstreamLink {
    sink: SplitSink<UpstreamSocket, WsMessage>,
}

impl UpstreamLink {
    pub fn new(sink: SplitSink<UpstreamSocket, WsMessage>) -> Self {
        Self { sink }
    }
}

impl RelayLink for UpstreamLink {
    async fn send(&mut self, frame: Frame) -> Result<(), SendFailed> {
        let message = match frame {
            Frame::Text(text) => WsMessage::Text(text.into()),
            Frame::Binary(bytes) => WsMessage::Binary(bytes.into()),
        };
        self.sink.send(message).await.map_err(|e| {
            tracing::warn!(error = %e, "upstream-side send failed");
            SendFailed
        })
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_owned().into(),
        };
        if let Err(e) = self.sink.send(WsMessage::Close(Some(frame))).await {
            tracing::debug!(error = %e, "upstream-side close was a no-op");
        }
    }
}

/// Drain the client's read half into the session event channel.
///
/// Exits when the client disconnects, errors, or the session loop goes away.
pub async fn pump_client(
    mut stream: SplitStream<ws::WebSocket>,
    tx: mpsc::Sender<SessionEvent<UpstreamLink>>,
) {
    while let Some(item) = stream.next().await {
        let event = match item {
            Ok(ws::Message::Text(text)) => SideEvent::Frame(Frame::Text(text.to_string())),
            Ok(ws::Message::Binary(bytes)) => SideEvent::Frame(Frame::Binary(bytes.to_vec())),
            Ok(ws::Message::Close(frame)) => {
                let _ = tx
                    .send(SessionEvent::Client(SideEvent::Closed(close_info_client(
                        frame,
                    ))))
                    .await;
                return;
            }
            // Ping/pong are transport keepalive, not application traffic.
            Ok(ws::Message::Ping(_)) | Ok(ws::Message::Pong(_)) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "client-side transport error");
                let _ = tx.send(SessionEvent::Client(SideEvent::Error)).await;
                return;
            }
        };
        if tx.send(SessionEvent::Client(event)).await.is_err() {
            return;
        }
    }

    // Stream ended without a close frame: a plain disconnect.
    let _ = tx
        .send(SessionEvent::Client(SideEvent::Closed(CloseInfo::empty())))
        .await;
}

/// Drain the upstream's read half into the session event channel.
pub async fn pump_upstream(
    mut stream: SplitStream<UpstreamSocket>,
    tx: mpsc::Sender<SessionEvent<UpstreamLink>>,
) {
    while let Some(item) = stream.next().await {
        let event = match item {
            Ok(WsMessage::Text(text)) => SideEvent::Frame(Frame::Text(text.to_string())),
            Ok(WsMessage::Binary(bytes)) => SideEvent::Frame(Frame::Binary(bytes.to_vec())),
            Ok(WsMessage::Close(frame)) => {
                let _ = tx
                    .send(SessionEvent::Upstream(SideEvent::Closed(
                        close_info_upstream(frame),
                    )))
                    .await;
                return;
            }
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Frame(_)) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "upstream-side transport error");
                let _ = tx.send(SessionEvent::Upstream(SideEvent::Error)).await;
                return;
            }
        };
        if tx.send(SessionEvent::Upstream(event)).await.is_err() {
            return;
        }
    }

    let _ = tx
        .send(SessionEvent::Upstream(SideEvent::Closed(CloseInfo::empty())))
        .await;
}

fn close_info_client(frame: Option<ws::CloseFrame>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo {
            code: Some(frame.code),
            reason: non_empty(frame.reason.as_str()),
        },
        None => CloseInfo::empty(),
    }
}

fn close_info_upstream(frame: Option<CloseFrame>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo {
            code: Some(u16::from(frame.code)),
            reason: non_empty(frame.reason.as_str()),
        },
        None => CloseInfo::empty(),
    }
}

fn non_empty(reason: &str) -> Option<String> {
    if reason.is_empty() {
        None
    } else {
        Some(reason.to_string())
    }
}
