//! Connection establishment for both roles.
//!
//! A [`Connector`] performs exactly one establish attempt per call; pacing
//! and retries belong to the connection loop (or the host's `tick()` rate
//! in manual mode). Failures are caught, optionally logged, and never
//! fatal; the next attempt simply tries again.

use std::io;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::config::Role;
use crate::error::{Result, SocketSerialError};
use crate::state::{LinkState, Shared};

/// Performs connect (client) or listen+accept (server) attempts and owns
/// the listener across them.
pub(crate) struct Connector {
    /// Server-role listener; bound lazily on the first attempt and reused
    /// for the life of the channel.
    listener: Option<TcpListener>,
}

impl Connector {
    pub(crate) fn new() -> Self {
        Self { listener: None }
    }

    /// One establish attempt. Returns the new stream on success, with
    /// no-delay set and the shared state already flipped to `Connected`.
    ///
    /// Failures surface internally as [`SocketSerialError::Connect`] and
    /// are logged (if not suppressed) and swallowed here; the caller only
    /// observes that no stream was produced.
    pub(crate) async fn attempt(&mut self, shared: &Shared) -> Option<TcpStream> {
        let result = match shared.config.role {
            Role::Client => self.attempt_connect(shared).await.map(Some),
            Role::Server => self.attempt_accept(shared).await,
        };

        let stream = match result {
            Ok(Some(stream)) => stream,
            Ok(None) => return None, // server role, nothing pending
            Err(e) => {
                if shared.config.log_errors {
                    tracing::warn!(endpoint = %shared.config.endpoint(), "{}", e);
                }
                shared.set_state(LinkState::Disconnected);
                return None;
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            if shared.config.log_errors {
                tracing::warn!("failed to set nodelay: {}", e);
            }
        }

        shared.set_state(LinkState::Connected);
        tracing::debug!(endpoint = %shared.config.endpoint(), "socket connected");
        Some(stream)
    }

    /// Client role: open an outbound connection, bounded by the retry
    /// interval so one attempt can never outlast its pacing slot.
    async fn attempt_connect(&mut self, shared: &Shared) -> Result<TcpStream> {
        shared.set_state(LinkState::Connecting);

        let endpoint = shared.config.endpoint();
        match timeout(shared.config.retry_interval, TcpStream::connect(&endpoint)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(SocketSerialError::Connect(e)),
            Err(_) => Err(SocketSerialError::Connect(io::Error::new(
                io::ErrorKind::TimedOut,
                "connect attempt timed out",
            ))),
        }
    }

    /// Server role: bind once, then check for one pending connection
    /// without blocking. While a peer is active this is never called, so a
    /// second pending connection stays queued in the OS backlog until the
    /// current one is torn down (single-peer model). `Ok(None)` means
    /// nothing was pending.
    async fn attempt_accept(&mut self, shared: &Shared) -> Result<Option<TcpStream>> {
        if self.listener.is_none() {
            let endpoint = shared.config.endpoint();
            let listener = TcpListener::bind(&endpoint)
                .await
                .map_err(SocketSerialError::Connect)?;
            tracing::debug!(endpoint = %endpoint, "server listening");
            self.listener = Some(listener);
        }

        let Some(listener) = self.listener.as_ref() else {
            return Ok(None);
        };

        // A zero-duration timeout polls the accept future once: a pending
        // connection wins, otherwise the attempt reports nothing ready.
        match timeout(Duration::ZERO, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                tracing::debug!(%peer, "accepted connection");
                Ok(Some(stream))
            }
            Ok(Err(e)) => Err(SocketSerialError::Connect(e)),
            Err(_) => Ok(None), // nothing pending
        }
    }
}
