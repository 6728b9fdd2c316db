//! # socket-serial
//!
//! A bidirectional, delimiter-framed message channel over TCP, with client
//! and server roles, automatic reconnection, and heartbeat liveness
//! detection.
//!
//! Designed for host applications (simulation loops, robotics controllers)
//! that must exchange discrete text messages with a remote peer without
//! blocking their own execution: `send()` and `receive()` only touch
//! in-memory buffers, while a background connection loop and a periodic I/O
//! worker move bytes on the wire.
//!
//! ## Wire format
//!
//! UTF-8 text messages concatenated with a configurable delimiter (default
//! `;`). No length prefix and no escaping: a payload containing the
//! delimiter is split into multiple messages at the peer. An idle
//! connection sends a bare delimiter each tick as a heartbeat frame.
//!
//! ## Example
//!
//! ```ignore
//! use socket_serial::{ConnectOptions, Drain, Role, SocketSerial};
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = SocketSerial::builder("127.0.0.1", 9000)
//!         .role(Role::Server)
//!         .build();
//!
//!     channel
//!         .connect(ConnectOptions::default().auto_reconnect())
//!         .await;
//!
//!     loop {
//!         for msg in channel.receive_wait(Drain::All).await {
//!             channel.send(format!("echo: {}", msg));
//!         }
//!     }
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod framer;

mod channel;
mod connector;
mod heartbeat;
mod state;
mod worker;

pub use buffer::Drain;
pub use channel::{SocketSerial, SocketSerialBuilder};
pub use config::{ConnectOptions, ExecutionMode, Role};
pub use error::SocketSerialError;
pub use state::LinkState;
