//! Error types for socket-serial.

use thiserror::Error;

/// Internal failure categories for a connection epoch.
///
/// None of these surface through the public API: connect failures are
/// retried by the connection loop, and I/O or liveness failures tear down
/// the current connection and (optionally) trigger a reconnect. The only
/// caller-visible signals are [`crate::SocketSerial::is_connected`] and the
/// contents of the incoming buffer.
#[derive(Debug, Error)]
pub enum SocketSerialError {
    /// Failed to bind, connect, or accept a connection.
    #[error("connect error: {0}")]
    Connect(#[source] std::io::Error),

    /// Read or write failed on an established stream.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer stayed silent past the missed-heartbeat limit.
    #[error("liveness timeout after {missed} idle ticks")]
    LivenessTimeout { missed: i32 },
}

/// Result type alias using SocketSerialError.
pub type Result<T> = std::result::Result<T, SocketSerialError>;
