//! Session control loop.
//!
//! # Responsibilities
//! - Own both connection sinks and the heartbeat handle for one session
//! - Apply the event → action table that bridges the two sides
//! - Guarantee a single, idempotent teardown path
//!
//! # Design Decisions
//! - One actor per session: listener tasks feed typed events over an mpsc
//!   channel, so session state is mutated serially without locks
//! - First terminal event wins; the loop exits after handling it, so at most
//!   one close call ever reaches each transport
//! - Client frames that arrive before the upstream opens are dropped, not
//!   queued; the upstream may still be connecting and the client gets no
//!   backpressure signal
//! - A failed send closes the *other* side; the failing side's own close
//!   event is expected to fire independently

use tokio::sync::mpsc;

use crate::config::HeartbeatConfig;
use crate::observability::metrics;
use crate::relay::heartbeat::Heartbeat;
use crate::relay::link::RelayLink;

/// Normal closure, used when propagating a client close with no code.
pub const CLOSE_NORMAL: u16 = 1000;
/// Internal error, used for all error and forwarding-failure paths and when
/// propagating an upstream close with no code.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

pub const REASON_CLIENT_CLOSED: &str = "client_closed";
pub const REASON_UPSTREAM_CLOSED: &str = "upstream_closed";
pub const REASON_CLIENT_ERROR: &str = "client_ws_error";
pub const REASON_UPSTREAM_ERROR: &str = "upstream_ws_error";

/// An application frame forwarded verbatim between the two sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Code and reason reported by a remote close, when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: Option<String>,
}

impl CloseInfo {
    /// A close that carried no code or reason.
    pub fn empty() -> Self {
        Self {
            code: None,
            reason: None,
        }
    }
}

/// What one side of the session reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEvent {
    Frame(Frame),
    Closed(CloseInfo),
    Error,
}

/// Everything the control loop can observe, from either side or the timer.
#[derive(Debug)]
pub enum SessionEvent<U> {
    /// The upstream connection completed its handshake; here is its sink.
    UpstreamOpen(U),
    Client(SideEvent),
    Upstream(SideEvent),
    KeepaliveTick,
}

enum Flow {
    Continue,
    Terminal,
}

struct Session<C, U> {
    id: String,
    client: C,
    upstream: Option<U>,
    heartbeat: Heartbeat,
    /// Handed to the heartbeat on upstream-open; `None` afterwards so the
    /// event channel can close once all producers are gone.
    tick_tx: Option<mpsc::Sender<SessionEvent<U>>>,
}

/// Drive one session to completion.
///
/// Consumes events until the first terminal condition, then tears down and
/// returns. The caller owns the listener tasks that feed `events`; they exit
/// on their own once the receiver is dropped.
pub async fn run<C, U>(
    id: String,
    client: C,
    mut events: mpsc::Receiver<SessionEvent<U>>,
    tick_tx: mpsc::Sender<SessionEvent<U>>,
    heartbeat_config: &HeartbeatConfig,
) where
    C: RelayLink,
    U: RelayLink + Send + 'static,
{
    let mut session = Session {
        id,
        client,
        upstream: None,
        heartbeat: Heartbeat::idle(),
        tick_tx: Some(tick_tx),
    };

    while let Some(event) = events.recv().await {
        if let Flow::Terminal = session.handle(event, heartbeat_config).await {
            break;
        }
    }

    session.heartbeat.cancel();
    tracing::debug!(session_id = %session.id, "session ended");
}

impl<C: RelayLink, U: RelayLink + Send + 'static> Session<C, U> {
    async fn handle(&mut self, event: SessionEvent<U>, heartbeat: &HeartbeatConfig) -> Flow {
        match event {
            SessionEvent::UpstreamOpen(sink) => {
                self.upstream = Some(sink);
                if let Some(tx) = self.tick_tx.take() {
                    self.heartbeat.start(
                        tx,
                        std::time::Duration::from_secs(heartbeat.interval_secs),
                        || SessionEvent::KeepaliveTick,
                    );
                }
                tracing::debug!(session_id = %self.id, "upstream open, heartbeat started");
                Flow::Continue
            }

            SessionEvent::Client(SideEvent::Frame(frame)) => match self.upstream.as_mut() {
                Some(upstream) => {
                    if upstream.send(frame).await.is_err() {
                        // client→upstream forwarding broke: close the client,
                        // leave the upstream to report its own failure.
                        self.heartbeat.cancel();
                        self.client
                            .close(CLOSE_INTERNAL_ERROR, REASON_UPSTREAM_ERROR)
                            .await;
                        Flow::Terminal
                    } else {
                        metrics::record_forward("client_to_upstream");
                        Flow::Continue
                    }
                }
                None => {
                    tracing::trace!(session_id = %self.id, "dropping frame, upstream not open");
                    Flow::Continue
                }
            },

            SessionEvent::Upstream(SideEvent::Frame(frame)) => {
                if self.client.send(frame).await.is_err() {
                    self.heartbeat.cancel();
                    if let Some(upstream) = self.upstream.as_mut() {
                        upstream
                            .close(CLOSE_INTERNAL_ERROR, REASON_CLIENT_ERROR)
                            .await;
                    }
                    Flow::Terminal
                } else {
                    metrics::record_forward("upstream_to_client");
                    Flow::Continue
                }
            }

            SessionEvent::Client(SideEvent::Closed(info)) => {
                self.heartbeat.cancel();
                if let Some(upstream) = self.upstream.as_mut() {
                    upstream
                        .close(
                            info.code.unwrap_or(CLOSE_NORMAL),
                            info.reason.as_deref().unwrap_or(REASON_CLIENT_CLOSED),
                        )
                        .await;
                }
                metrics::record_session_closed("client");
                Flow::Terminal
            }

            SessionEvent::Upstream(SideEvent::Closed(info)) => {
                self.heartbeat.cancel();
                self.client
                    .close(
                        info.code.unwrap_or(CLOSE_INTERNAL_ERROR),
                        info.reason.as_deref().unwrap_or(REASON_UPSTREAM_CLOSED),
                    )
                    .await;
                metrics::record_session_closed("upstream");
                Flow::Terminal
            }

            SessionEvent::Client(SideEvent::Error) => {
                self.heartbeat.cancel();
                if let Some(upstream) = self.upstream.as_mut() {
                    upstream
                        .close(CLOSE_INTERNAL_ERROR, REASON_CLIENT_ERROR)
                        .await;
                }
                metrics::record_session_closed("client");
                Flow::Terminal
            }

            SessionEvent::Upstream(SideEvent::Error) => {
                self.heartbeat.cancel();
                self.client
                    .close(CLOSE_INTERNAL_ERROR, REASON_UPSTREAM_ERROR)
                    .await;
                metrics::record_session_closed("upstream");
                Flow::Terminal
            }

            SessionEvent::KeepaliveTick => {
                if let Some(upstream) = self.upstream.as_mut() {
                    let payload = Frame::Text(heartbeat.payload.clone());
                    if upstream.send(payload).await.is_err() {
                        // A broken keepalive stops future ticks but does not
                        // tear the session down; the socket's own close or
                        // error event drives that through the normal paths.
                        tracing::debug!(session_id = %self.id, "keepalive failed, heartbeat stopped");
                        self.heartbeat.cancel();
                    }
                }
                Flow::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::relay::link::SendFailed;

    /// Records every send and close; can be told to fail sends.
    #[derive(Clone, Default)]
    struct MockLink {
        sent: Arc<Mutex<Vec<Frame>>>,
        closes: Arc<Mutex<Vec<(u16, String)>>>,
        fail_sends: Arc<AtomicBool>,
    }

    impl MockLink {
        fn sent(&self) -> Vec<Frame> {
            self.sent.lock().unwrap().clone()
        }

        fn closes(&self) -> Vec<(u16, String)> {
            self.closes.lock().unwrap().clone()
        }
    }

    impl RelayLink for MockLink {
        async fn send(&mut self, frame: Frame) -> Result<(), SendFailed> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(SendFailed);
            }
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn close(&mut self, code: u16, reason: &str) {
            self.closes.lock().unwrap().push((code, reason.to_string()));
        }
    }

    fn heartbeat_config() -> HeartbeatConfig {
        HeartbeatConfig::default()
    }

    struct Harness {
        client: MockLink,
        upstream: MockLink,
        tx: mpsc::Sender<SessionEvent<MockLink>>,
        task: tokio::task::JoinHandle<()>,
    }

    fn start_session(config: HeartbeatConfig) -> Harness {
        let client = MockLink::default();
        let upstream = MockLink::default();
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn({
            let client = client.clone();
            let tx = tx.clone();
            async move { run("test-session".to_string(), client, rx, tx, &config).await }
        });
        Harness {
            client,
            upstream,
            tx,
            task,
        }
    }

    async fn open_upstream(h: &Harness) {
        h.tx.send(SessionEvent::UpstreamOpen(h.upstream.clone()))
            .await
            .unwrap();
    }

    fn text(s: &str) -> Frame {
        Frame::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_forwards_both_directions_after_open() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.tx.send(SessionEvent::Client(SideEvent::Frame(text("to-upstream"))))
            .await
            .unwrap();
        h.tx.send(SessionEvent::Upstream(SideEvent::Frame(text("to-client"))))
            .await
            .unwrap();
        h.tx.send(SessionEvent::Client(SideEvent::Closed(CloseInfo::empty())))
            .await
            .unwrap();
        h.task.await.unwrap();

        assert_eq!(h.upstream.sent(), vec![text("to-upstream")]);
        assert_eq!(h.client.sent(), vec![text("to-client")]);
    }

    #[tokio::test]
    async fn test_client_frames_before_open_are_dropped() {
        let h = start_session(heartbeat_config());

        h.tx.send(SessionEvent::Client(SideEvent::Frame(text("early"))))
            .await
            .unwrap();
        open_upstream(&h).await;
        h.tx.send(SessionEvent::Client(SideEvent::Frame(text("late"))))
            .await
            .unwrap();
        h.tx.send(SessionEvent::Client(SideEvent::Closed(CloseInfo::empty())))
            .await
            .unwrap();
        h.task.await.unwrap();

        // The early frame is gone, not queued for later delivery.
        assert_eq!(h.upstream.sent(), vec![text("late")]);
    }

    #[tokio::test]
    async fn test_client_close_code_and_reason_propagate() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.tx.send(SessionEvent::Client(SideEvent::Closed(CloseInfo {
            code: Some(4000),
            reason: Some("bye".to_string()),
        })))
        .await
        .unwrap();
        h.task.await.unwrap();

        assert_eq!(h.upstream.closes(), vec![(4000, "bye".to_string())]);
        assert!(h.client.closes().is_empty());
    }

    #[tokio::test]
    async fn test_client_close_defaults() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.tx.send(SessionEvent::Client(SideEvent::Closed(CloseInfo::empty())))
            .await
            .unwrap();
        h.task.await.unwrap();

        assert_eq!(
            h.upstream.closes(),
            vec![(CLOSE_NORMAL, REASON_CLIENT_CLOSED.to_string())]
        );
    }

    #[tokio::test]
    async fn test_upstream_close_defaults() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.tx.send(SessionEvent::Upstream(SideEvent::Closed(CloseInfo::empty())))
            .await
            .unwrap();
        h.task.await.unwrap();

        assert_eq!(
            h.client.closes(),
            vec![(CLOSE_INTERNAL_ERROR, REASON_UPSTREAM_CLOSED.to_string())]
        );
        assert!(h.upstream.closes().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_toward_upstream_closes_client_only() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.upstream.fail_sends.store(true, Ordering::SeqCst);
        h.tx.send(SessionEvent::Client(SideEvent::Frame(text("doomed"))))
            .await
            .unwrap();
        h.task.await.unwrap();

        assert_eq!(
            h.client.closes(),
            vec![(CLOSE_INTERNAL_ERROR, REASON_UPSTREAM_ERROR.to_string())]
        );
        // The failed side is left alone; its own close event fires later.
        assert!(h.upstream.closes().is_empty());
        assert!(h.upstream.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_toward_client_closes_upstream_only() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.client.fail_sends.store(true, Ordering::SeqCst);
        h.tx.send(SessionEvent::Upstream(SideEvent::Frame(text("doomed"))))
            .await
            .unwrap();
        h.task.await.unwrap();

        assert_eq!(
            h.upstream.closes(),
            vec![(CLOSE_INTERNAL_ERROR, REASON_CLIENT_ERROR.to_string())]
        );
        assert!(h.client.closes().is_empty());
    }

    #[tokio::test]
    async fn test_client_error_closes_upstream() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.tx.send(SessionEvent::Client(SideEvent::Error)).await.unwrap();
        h.task.await.unwrap();

        assert_eq!(
            h.upstream.closes(),
            vec![(CLOSE_INTERNAL_ERROR, REASON_CLIENT_ERROR.to_string())]
        );
    }

    #[tokio::test]
    async fn test_upstream_error_closes_client() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        h.tx.send(SessionEvent::Upstream(SideEvent::Error)).await.unwrap();
        h.task.await.unwrap();

        assert_eq!(
            h.client.closes(),
            vec![(CLOSE_INTERNAL_ERROR, REASON_UPSTREAM_ERROR.to_string())]
        );
    }

    #[tokio::test]
    async fn test_racing_terminal_events_close_each_side_at_most_once() {
        let h = start_session(heartbeat_config());
        open_upstream(&h).await;

        // All of these race to tear the session down; only the first should
        // produce a close call.
        h.tx.send(SessionEvent::Client(SideEvent::Closed(CloseInfo::empty())))
            .await
            .unwrap();
        h.tx.send(SessionEvent::Client(SideEvent::Error)).await.unwrap();
        h.tx.send(SessionEvent::Upstream(SideEvent::Error)).await.unwrap();
        h.task.await.unwrap();

        assert_eq!(h.upstream.closes().len(), 1);
        assert!(h.client.closes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_cadence() {
        let config = heartbeat_config();
        let payload = text(&config.payload);
        let h = start_session(config);

        // No keepalives before the upstream opens.
        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert!(h.upstream.sent().is_empty());

        open_upstream(&h).await;
        // Let the loop process the open and the timer register its interval.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        for expected in 1..=3 {
            tokio::time::advance(Duration::from_secs(20)).await;
            // Let the tick cross the channel and the loop process it.
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            assert_eq!(h.upstream.sent().len(), expected);
        }
        assert_eq!(h.upstream.sent(), vec![payload.clone(), payload.clone(), payload]);

        // Terminal event; no more keepalives afterwards.
        h.tx.send(SessionEvent::Client(SideEvent::Closed(CloseInfo::empty())))
            .await
            .unwrap();
        h.task.await.unwrap();
        let after = h.upstream.sent().len();
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.upstream.sent().len(), after);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_failure_stops_heartbeat_not_session() {
        let config = heartbeat_config();
        let h = start_session(config);
        open_upstream(&h).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        h.upstream.fail_sends.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(20)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        // Heartbeat is gone, but the session still forwards.
        h.upstream.fail_sends.store(false, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(120)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(h.upstream.sent().is_empty());

        h.tx.send(SessionEvent::Client(SideEvent::Frame(text("still-alive"))))
            .await
            .unwrap();
        h.tx.send(SessionEvent::Client(SideEvent::Closed(CloseInfo::empty())))
            .await
            .unwrap();
        h.task.await.unwrap();
        assert_eq!(h.upstream.sent(), vec![text("still-alive")]);
    }
}
