//! Connection state and the shared core.
//!
//! The connection/kill booleans of a naive port become one explicit
//! [`LinkState`] held in a `tokio::sync::watch` channel: transitions are
//! `Disconnected -> Connecting -> Connected -> Disconnected` across
//! reconnect epochs, plus a terminal `Killed` reached only via
//! `disconnect()`. The watch doubles as the cooperative cancellation
//! signal, so both background loops use kill-cancellable sleeps instead of
//! bare wall-clock waits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};

use crate::buffer::MessageQueue;
use crate::config::Config;
use crate::framer::MessageFramer;

/// Lifecycle state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No active stream.
    Disconnected,
    /// An outbound connect attempt is in flight.
    Connecting,
    /// A stream is established and the I/O worker may run.
    Connected,
    /// `disconnect()` was called. Terminal.
    Killed,
}

/// State shared between the public handle, the connection loop, and the
/// I/O worker.
///
/// The buffers and the framer remainder deliberately outlive individual
/// connection epochs: a reconnect does not clear messages the host has not
/// drained yet.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) outgoing: MessageQueue,
    pub(crate) incoming: MessageQueue,
    pub(crate) framer: std::sync::Mutex<MessageFramer>,
    /// Signalled whenever messages land in the incoming queue.
    pub(crate) incoming_ready: Notify,
    state: watch::Sender<LinkState>,
}

impl Shared {
    pub(crate) fn new(config: Config) -> Arc<Self> {
        let framer = MessageFramer::new(&config.delimiter);
        let (state, _) = watch::channel(LinkState::Disconnected);
        Arc::new(Self {
            config,
            outgoing: MessageQueue::new(),
            incoming: MessageQueue::new(),
            framer: std::sync::Mutex::new(framer),
            incoming_ready: Notify::new(),
            state,
        })
    }

    /// Instantaneous state read.
    pub(crate) fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.state() == LinkState::Killed
    }

    /// Transition to `state`. `Killed` is terminal and never overwritten.
    pub(crate) fn set_state(&self, state: LinkState) {
        self.state.send_modify(|current| {
            if *current != LinkState::Killed {
                *current = state;
            }
        });
    }

    /// Enter the terminal `Killed` state and wake every waiter.
    pub(crate) fn kill(&self) {
        self.state.send_modify(|current| *current = LinkState::Killed);
        // Release any receive_wait() caller parked on the incoming queue.
        self.incoming_ready.notify_waiters();
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Suspend until the channel is killed.
    pub(crate) async fn killed(&self) {
        let mut rx = self.subscribe();
        // The sender lives in Shared itself, so wait_for cannot see it drop.
        let _ = rx.wait_for(|s| *s == LinkState::Killed).await;
    }

    /// Sleep for `duration`, returning early if the channel is killed.
    pub(crate) async fn idle(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.killed() => {}
        }
    }

    /// Lock the framer. Held only for the duration of one push, never
    /// across an await.
    pub(crate) fn framer(&self) -> std::sync::MutexGuard<'_, MessageFramer> {
        self.framer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ExecutionMode, Role, DEFAULT_DELIMITER, DEFAULT_HEARTBEAT_GRACE, DEFAULT_HEARTBEAT_LIMIT,
        DEFAULT_IO_TIMEOUT, DEFAULT_RETRY_INTERVAL,
    };

    fn shared() -> Arc<Shared> {
        Shared::new(Config {
            address: "127.0.0.1".to_string(),
            port: 0,
            role: Role::Client,
            mode: ExecutionMode::Background,
            delimiter: DEFAULT_DELIMITER.to_string(),
            heartbeat_limit: DEFAULT_HEARTBEAT_LIMIT,
            heartbeat_grace: DEFAULT_HEARTBEAT_GRACE,
            io_timeout: DEFAULT_IO_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            log_errors: false,
        })
    }

    #[test]
    fn test_initial_state_is_disconnected() {
        let shared = shared();
        assert_eq!(shared.state(), LinkState::Disconnected);
        assert!(!shared.is_connected());
    }

    #[test]
    fn test_transitions() {
        let shared = shared();
        shared.set_state(LinkState::Connecting);
        assert_eq!(shared.state(), LinkState::Connecting);
        shared.set_state(LinkState::Connected);
        assert!(shared.is_connected());
        shared.set_state(LinkState::Disconnected);
        assert_eq!(shared.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_killed_is_terminal() {
        let shared = shared();
        shared.kill();
        shared.set_state(LinkState::Connected);
        assert_eq!(shared.state(), LinkState::Killed);
        assert!(shared.is_killed());
    }

    #[tokio::test]
    async fn test_idle_returns_early_on_kill() {
        let shared = shared();
        let waiter = {
            let shared = shared.clone();
            tokio::spawn(async move {
                shared.idle(Duration::from_secs(30)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        shared.kill();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("idle should observe kill promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_killed_wakes_watch_waiter() {
        let shared = shared();
        let mut rx = shared.subscribe();
        shared.kill();
        let state = rx
            .wait_for(|s| *s == LinkState::Killed)
            .await
            .map(|s| *s)
            .unwrap();
        assert_eq!(state, LinkState::Killed);
    }
}
