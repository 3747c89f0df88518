//! Heartbeat scheduler for the upstream side of a session.
//!
//! # Responsibilities
//! - Own the single repeating keepalive timer for one session
//! - Emit a tick event into the session's event channel at a fixed interval
//! - Stay cancellable from every terminal path, idempotently
//!
//! # Design Decisions
//! - The timer task only emits ticks; the session loop owns the upstream
//!   sink and performs the actual send, so session state stays single-owner
//! - The first tick fires one full interval after start, never immediately
//! - Cancelling twice is a no-op; a session holds at most one live timer

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// A cancellable repeating timer owned by one session.
///
/// Starts idle; [`Heartbeat::start`] arms it once the upstream connection
/// reports open.
#[derive(Debug, Default)]
pub struct Heartbeat {
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// A heartbeat that has not been armed yet.
    pub fn idle() -> Self {
        Self { handle: None }
    }

    /// Arm the timer. Every `interval` it sends `make_tick()` into `tx`.
    ///
    /// The timer stops on its own when the session's event channel closes.
    /// Re-arming an active heartbeat cancels the previous timer first, so at
    /// most one non-cancelled timer exists per session.
    pub fn start<E, F>(&mut self, tx: mpsc::Sender<E>, interval: Duration, make_tick: F)
    where
        E: Send + 'static,
        F: Fn() -> E + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                if tx.send(make_tick()).await.is_err() {
                    // Session loop is gone; nothing left to tick for.
                    break;
                }
            }
        }));
    }

    /// Whether a timer is currently armed.
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel the timer. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_interval_not_immediately() {
        let (tx, mut rx) = mpsc::channel::<()>(8);
        let mut heartbeat = Heartbeat::idle();
        heartbeat.start(tx, Duration::from_secs(20), || ());
        // Let the timer task register its interval before touching the clock.
        tokio::task::yield_now().await;

        // Nothing before the first interval elapses.
        time::advance(Duration::from_secs(19)).await;
        assert!(rx.try_recv().is_err());

        time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        // One tick per interval.
        time::advance(Duration::from_secs(40)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks_and_is_idempotent() {
        let (tx, mut rx) = mpsc::channel::<()>(8);
        let mut heartbeat = Heartbeat::idle();
        heartbeat.start(tx, Duration::from_secs(20), || ());
        assert!(heartbeat.is_active());

        heartbeat.cancel();
        heartbeat.cancel();
        assert!(!heartbeat.is_active());

        time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_timer() {
        let (tx, mut rx) = mpsc::channel::<u32>(8);
        let mut heartbeat = Heartbeat::idle();
        heartbeat.start(tx.clone(), Duration::from_secs(20), || 1);
        heartbeat.start(tx, Duration::from_secs(20), || 2);
        tokio::task::yield_now().await;

        time::advance(Duration::from_secs(20)).await;
        tokio::task::yield_now().await;
        assert_eq!(rx.try_recv().ok(), Some(2));
        assert!(rx.try_recv().is_err());
    }
}
