//! Endpoint configuration.
//!
//! A [`Config`] is fixed at construction time and shared (behind `Arc`)
//! between the connection loop, the I/O worker, and the public handle.
//! Tunables that the channel reads on every tick (delimiter, heartbeat
//! limits, timeouts) all live here so a connection epoch never observes a
//! half-updated configuration.

use std::time::Duration;

/// Which side of the TCP connection this endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Open an outbound connection to `address:port`.
    Client,
    /// Bind `address:port`, listen, and accept a single peer.
    Server,
}

/// How the channel is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Self-driven: `connect()` spawns a connection/retry task which in turn
    /// spawns an I/O worker task per established stream.
    Background,
    /// Host-driven: no tasks are spawned; the host awaits
    /// [`crate::SocketSerial::tick`] at its own (bounded) rate.
    Manual,
}

/// Default message delimiter.
pub const DEFAULT_DELIMITER: &str = ";";

/// Default consecutive idle ticks before the link is declared dead.
pub const DEFAULT_HEARTBEAT_LIMIT: i32 = 50;

/// Default grace ticks absorbed right after a connect.
pub const DEFAULT_HEARTBEAT_GRACE: i32 = 5;

/// Default bound on a single read/write call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(100);

/// Default pause between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default I/O worker tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Bytes read from the stream per receive phase.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Immutable endpoint configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address to connect to (client) or bind (server).
    pub address: String,
    /// TCP port.
    pub port: u16,
    /// Client or server role.
    pub role: Role,
    /// Background tasks vs. host-driven ticks.
    pub mode: ExecutionMode,
    /// Message delimiter appended to every outgoing message. A bare
    /// delimiter doubles as the heartbeat frame.
    pub delimiter: String,
    /// Consecutive idle ticks tolerated before teardown.
    pub heartbeat_limit: i32,
    /// Idle ticks forgiven right after connecting, absorbing startup jitter.
    pub heartbeat_grace: i32,
    /// Upper bound on a single write call (and the client connect attempt).
    pub io_timeout: Duration,
    /// Pause between connection attempts in the retry loop.
    pub retry_interval: Duration,
    /// Log internal connect/I/O failures at `warn` instead of swallowing
    /// them silently.
    pub log_errors: bool,
}

impl Config {
    /// `address:port` in the form the socket APIs expect.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Delimiter as raw wire bytes.
    pub(crate) fn delimiter_bytes(&self) -> &[u8] {
        self.delimiter.as_bytes()
    }
}

/// Options for a single `connect()` call.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    /// Suspend the caller until Connected (or the channel is killed).
    pub blocking: bool,
    /// Keep retrying after the first successful connection is lost.
    pub auto_reconnect: bool,
    /// I/O worker tick period.
    pub period: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            blocking: false,
            auto_reconnect: false,
            period: DEFAULT_TICK_PERIOD,
        }
    }
}

impl ConnectOptions {
    /// Suspend the `connect()` caller until the link is up.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    /// Reconnect automatically whenever the link drops.
    pub fn auto_reconnect(mut self) -> Self {
        self.auto_reconnect = true;
        self
    }

    /// Override the I/O worker tick period.
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}
