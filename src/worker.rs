//! The periodic I/O worker.
//!
//! One [`IoWorker`] exists per connection epoch and is the only code that
//! touches the stream. Each tick drains the outgoing queue to the wire (or
//! sends a bare delimiter as a heartbeat frame), then performs one bounded
//! non-blocking read, feeding any bytes through the shared framer into the
//! incoming queue and updating the heartbeat monitor.
//!
//! In Background mode [`IoWorker::run`] loops at the configured period as a
//! spawned task; Manual mode drives the same [`IoWorker::tick`] directly.
//! The worker tears its own connection down on any failure but never
//! decides about reconnecting; that is the connection loop's job.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::READ_CHUNK_SIZE;
use crate::error::{Result, SocketSerialError};
use crate::heartbeat::HeartbeatMonitor;
use crate::state::{LinkState, Shared};

/// Drives send/receive cycles on one established stream.
pub(crate) struct IoWorker {
    stream: TcpStream,
    heartbeat: HeartbeatMonitor,
    shared: Arc<Shared>,
    period: Duration,
}

impl IoWorker {
    /// Wrap a freshly established stream. The heartbeat counter starts in
    /// its grace window.
    pub(crate) fn new(stream: TcpStream, shared: Arc<Shared>, period: Duration) -> Self {
        let heartbeat = HeartbeatMonitor::new(
            shared.config.heartbeat_grace,
            shared.config.heartbeat_limit,
        );
        Self {
            stream,
            heartbeat,
            shared,
            period,
        }
    }

    /// Background-mode loop: tick, then sleep one period, until the channel
    /// is killed or this epoch fails.
    pub(crate) async fn run(mut self) {
        tracing::debug!("i/o worker started");
        loop {
            if self.shared.is_killed() || !self.shared.is_connected() {
                break;
            }
            if let Err(e) = self.tick().await {
                self.log_failure(&e);
                break;
            }
            self.shared.idle(self.period).await;
        }
        self.close();
    }

    /// One full send-then-receive cycle.
    pub(crate) async fn tick(&mut self) -> Result<()> {
        self.flush_outgoing().await?;
        self.poll_incoming().await
    }

    /// Send phase: every queued message followed by the delimiter, written
    /// in one bounded call; a bare delimiter when nothing is queued.
    async fn flush_outgoing(&mut self) -> Result<()> {
        let delimiter = self.shared.config.delimiter_bytes();
        let pending = self.shared.outgoing.take_all();

        let wire = if pending.is_empty() {
            BytesMut::from(delimiter)
        } else {
            let mut wire = BytesMut::new();
            for message in &pending {
                wire.extend_from_slice(message.as_bytes());
                wire.extend_from_slice(delimiter);
            }
            wire
        };

        self.write_bounded(&wire).await
    }

    /// Receive phase: one non-blocking read of up to [`READ_CHUNK_SIZE`]
    /// bytes. No data counts as a missed heartbeat; enough misses is a
    /// liveness failure.
    async fn poll_incoming(&mut self) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        match self.stream.try_read(&mut buf) {
            Ok(0) => Err(SocketSerialError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            ))),
            Ok(n) => {
                let messages = self.shared.framer().push(&buf[..n]);
                if !messages.is_empty() {
                    self.shared.incoming.extend(messages);
                    // Permit semantics: a waiter that has not parked yet
                    // still observes this arrival.
                    self.shared.incoming_ready.notify_one();
                }
                self.heartbeat.mark_active();
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if self.heartbeat.mark_idle() {
                    Err(SocketSerialError::LivenessTimeout {
                        missed: self.heartbeat.missed(),
                    })
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(SocketSerialError::Io(e)),
        }
    }

    /// Write with the configured bound so one tick can never stall past it.
    async fn write_bounded(&mut self, bytes: &[u8]) -> Result<()> {
        match timeout(self.shared.config.io_timeout, self.stream.write_all(bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SocketSerialError::Io(e)),
            Err(_) => Err(SocketSerialError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "write timed out",
            ))),
        }
    }

    /// Liveness expiry is expected operational behavior and logged as such;
    /// real I/O errors honor the suppression flag.
    pub(crate) fn log_failure(&self, error: &SocketSerialError) {
        match error {
            SocketSerialError::LivenessTimeout { missed } => {
                tracing::debug!(missed, "heartbeat limit reached, dropping connection");
            }
            other => {
                if self.shared.config.log_errors {
                    tracing::warn!("i/o failure: {}", other);
                }
            }
        }
    }

    /// Tear down this epoch: flip state back to Disconnected and release
    /// the stream. Whether anyone reconnects is not decided here.
    pub(crate) fn close(self) {
        if self.shared.is_connected() {
            tracing::debug!("connection dropped");
        }
        self.shared.set_state(LinkState::Disconnected);
        drop(self.stream);
    }
}
