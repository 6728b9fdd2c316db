//! The public channel handle and its connection lifecycle.
//!
//! [`SocketSerial`] is built once via [`SocketSerialBuilder`] with an
//! immutable endpoint configuration. In Background execution mode,
//! `connect()` spawns the connection/retry loop, which in turn spawns one
//! I/O worker task per established stream. In Manual mode nothing is
//! spawned; the host awaits [`SocketSerial::tick`] on its own schedule.
//!
//! # Example
//!
//! ```ignore
//! use socket_serial::{ConnectOptions, Role, SocketSerial};
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = SocketSerial::builder("127.0.0.1", 9000)
//!         .role(Role::Client)
//!         .build();
//!
//!     channel
//!         .connect(ConnectOptions::default().blocking().auto_reconnect())
//!         .await;
//!
//!     channel.send("hello");
//!     let incoming = channel.receive(socket_serial::Drain::All);
//!     channel.disconnect().await;
//! }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::buffer::Drain;
use crate::config::{
    Config, ConnectOptions, ExecutionMode, Role, DEFAULT_DELIMITER, DEFAULT_HEARTBEAT_GRACE,
    DEFAULT_HEARTBEAT_LIMIT, DEFAULT_IO_TIMEOUT, DEFAULT_RETRY_INTERVAL,
};
use crate::connector::Connector;
use crate::state::{LinkState, Shared};
use crate::worker::IoWorker;

/// Bounded wait for a loop to observe the kill signal before its task is
/// force-released.
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Builder for a [`SocketSerial`] channel.
///
/// Address and port are mandatory; everything else has the defaults the
/// wire format was designed around.
pub struct SocketSerialBuilder {
    address: String,
    port: u16,
    role: Role,
    mode: ExecutionMode,
    delimiter: String,
    heartbeat_limit: i32,
    heartbeat_grace: i32,
    io_timeout: Duration,
    retry_interval: Duration,
    log_errors: bool,
}

impl SocketSerialBuilder {
    /// Start a builder for the given endpoint.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            role: Role::Client,
            mode: ExecutionMode::Background,
            delimiter: DEFAULT_DELIMITER.to_string(),
            heartbeat_limit: DEFAULT_HEARTBEAT_LIMIT,
            heartbeat_grace: DEFAULT_HEARTBEAT_GRACE,
            io_timeout: DEFAULT_IO_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            log_errors: false,
        }
    }

    /// Client (outbound connect) or server (listen + accept one peer).
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Background tasks or host-driven `tick()` calls.
    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Message delimiter (default `;`). Must be non-empty.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Consecutive idle ticks tolerated before the link is declared dead.
    pub fn heartbeat_limit(mut self, limit: i32) -> Self {
        self.heartbeat_limit = limit;
        self
    }

    /// Idle ticks forgiven right after a connect.
    pub fn heartbeat_grace(mut self, grace: i32) -> Self {
        self.heartbeat_grace = grace;
        self
    }

    /// Upper bound on a single read/write call (default 100ms).
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Pause between connection attempts (default 1s).
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Log internal connect/I/O failures instead of suppressing them.
    pub fn log_errors(mut self, log: bool) -> Self {
        self.log_errors = log;
        self
    }

    /// Build the channel. No connection is attempted yet.
    ///
    /// # Panics
    ///
    /// Panics if the configured delimiter is empty.
    pub fn build(self) -> SocketSerial {
        let config = Config {
            address: self.address,
            port: self.port,
            role: self.role,
            mode: self.mode,
            delimiter: self.delimiter,
            heartbeat_limit: self.heartbeat_limit,
            heartbeat_grace: self.heartbeat_grace,
            io_timeout: self.io_timeout,
            retry_interval: self.retry_interval,
            log_errors: self.log_errors,
        };
        let mode = config.mode;
        let shared = Shared::new(config);
        SocketSerial {
            shared,
            connection_task: Mutex::new(None),
            driver: tokio::sync::Mutex::new(match mode {
                ExecutionMode::Manual => Some(ManualDriver::new()),
                ExecutionMode::Background => None,
            }),
        }
    }
}

/// A bidirectional, delimiter-framed TCP message channel.
///
/// All methods take `&self`; the handle can be shared behind an `Arc` and
/// driven from any number of tasks. Send and receive never block on the
/// wire: they only touch the in-memory buffers, which persist across
/// reconnects until explicitly cleared.
pub struct SocketSerial {
    shared: Arc<Shared>,
    /// Background-mode connection loop task.
    connection_task: Mutex<Option<JoinHandle<()>>>,
    /// Manual-mode state machine; `None` in Background mode.
    driver: tokio::sync::Mutex<Option<ManualDriver>>,
}

impl SocketSerial {
    /// Start building a channel for `address:port`.
    pub fn builder(address: impl Into<String>, port: u16) -> SocketSerialBuilder {
        SocketSerialBuilder::new(address, port)
    }

    /// Begin connecting (Background mode).
    ///
    /// Spawns the connection/retry loop: one establish attempt per retry
    /// interval, an I/O worker spawned per established stream, looping
    /// while the channel is alive and either auto-reconnect is set or no
    /// connection has succeeded yet. With `opts.blocking` the caller is
    /// suspended until the state reaches Connected (or the channel is
    /// killed).
    ///
    /// In Manual mode this is a no-op: the host's `tick()` calls drive
    /// connection attempts instead.
    pub async fn connect(&self, opts: ConnectOptions) {
        if self.shared.config.mode != ExecutionMode::Background {
            tracing::debug!("connect() ignored in manual execution mode");
            return;
        }
        if self.shared.is_killed() {
            return;
        }

        {
            let mut task = self.lock_connection_task();
            if task.is_some() {
                tracing::debug!("connect() called twice, already running");
                return;
            }
            let shared = self.shared.clone();
            *task = Some(tokio::spawn(connection_loop(shared, opts)));
        }

        if opts.blocking {
            let mut rx = self.shared.subscribe();
            let _ = rx
                .wait_for(|s| matches!(s, LinkState::Connected | LinkState::Killed))
                .await;
        }
    }

    /// Shut the channel down. Terminal: the instance cannot reconnect
    /// afterwards.
    ///
    /// Sets the kill signal, waits a bounded interval for the connection
    /// loop (and through it the I/O worker) to observe it, then force-
    /// releases the tasks and any manual-mode resources regardless.
    pub async fn disconnect(&self) {
        self.shared.kill();

        let task = self.lock_connection_task().take();
        if let Some(mut handle) = task {
            if timeout(SHUTDOWN_JOIN_TIMEOUT, &mut handle).await.is_err() {
                handle.abort();
            }
        }

        if let Some(driver) = self.driver.lock().await.as_mut() {
            driver.shutdown();
        }

        tracing::debug!("connection closed");
    }

    /// Queue a message for transmission on the next I/O tick.
    ///
    /// Never blocks. The delimiter is appended on the wire, so a message
    /// containing the delimiter arrives as several messages at the peer.
    pub fn send(&self, message: impl Into<String>) {
        self.shared.outgoing.push(message.into());
    }

    /// Remove and return received messages in arrival order.
    ///
    /// Never blocks; returns whatever is buffered (possibly nothing).
    pub fn receive(&self, drain: Drain) -> Vec<String> {
        self.shared.incoming.drain(drain)
    }

    /// Like [`receive`](Self::receive), but suspends until at least one
    /// message is buffered or the channel is killed (then returns empty).
    pub async fn receive_wait(&self, drain: Drain) -> Vec<String> {
        // A zero-size drain can never produce a message; waiting on one
        // would park the caller forever.
        if drain == Drain::First(0) {
            return Vec::new();
        }
        loop {
            let messages = self.shared.incoming.drain(drain);
            if !messages.is_empty() || self.shared.is_killed() {
                return messages;
            }
            // notify_one on the producer side stores a permit, so an
            // arrival between this drain and the await is not lost.
            tokio::select! {
                _ = self.shared.incoming_ready.notified() => {}
                _ = self.shared.killed() => return Vec::new(),
            }
        }
    }

    /// Instantaneous connection check.
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Current lifecycle state, for diagnostics.
    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    /// Atomically empty the incoming buffer.
    pub fn clear_in_buffer(&self) {
        self.shared.incoming.clear();
    }

    /// Atomically empty the outgoing buffer.
    pub fn clear_out_buffer(&self) {
        self.shared.outgoing.clear();
    }

    /// One cooperative cycle (Manual mode): a connection attempt if
    /// disconnected, then one send/receive cycle if connected.
    ///
    /// The host must pace its own calls; with no inter-call delay every
    /// call re-enters the bounded read/write path back to back, which can
    /// show up as spurious heartbeat or write-timeout failures.
    ///
    /// In Background mode this is a no-op.
    pub async fn tick(&self) {
        if self.shared.is_killed() {
            return;
        }
        let mut driver = self.driver.lock().await;
        let Some(driver) = driver.as_mut() else {
            tracing::debug!("tick() ignored in background execution mode");
            return;
        };
        driver.cycle(&self.shared).await;
    }

    fn lock_connection_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // A poisoned lock only means a panic elsewhere mid-update; the
        // Option<JoinHandle> itself is still usable.
        self.connection_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

/// Background-mode connection/retry loop.
///
/// Runs until killed, or until the first attempt has resolved when
/// auto-reconnect is off. The previous epoch's worker is joined (bounded)
/// before a new stream is established, so at most one worker ever touches
/// a stream.
async fn connection_loop(shared: Arc<Shared>, opts: ConnectOptions) {
    let mut connector = Connector::new();
    let mut worker_task: Option<JoinHandle<()>> = None;
    let mut first_attempt = true;

    while !shared.is_killed() && (opts.auto_reconnect || first_attempt) {
        if !shared.is_connected() {
            join_worker(&mut worker_task).await;

            if let Some(stream) = connector.attempt(&shared).await {
                let worker = IoWorker::new(stream, shared.clone(), opts.period);
                worker_task = Some(tokio::spawn(worker.run()));
                first_attempt = false;
            } else if !opts.auto_reconnect && shared.config.role == Role::Client {
                // A one-shot client gets exactly one attempt; a server
                // keeps polling for its first peer.
                first_attempt = false;
            }
        }

        shared.idle(shared.config.retry_interval).await;
    }

    // A one-shot loop (auto-reconnect off) stops retrying after its first
    // epoch, but stays alive as the worker's owner so teardown remains a
    // bounded join rather than a detached task.
    if !shared.is_killed() && worker_task.is_some() {
        shared.killed().await;
    }
    join_worker(&mut worker_task).await;
}

/// Bounded join of the previous I/O worker, aborting it if it does not
/// observe the state change in time.
async fn join_worker(worker_task: &mut Option<JoinHandle<()>>) {
    if let Some(mut handle) = worker_task.take() {
        if timeout(SHUTDOWN_JOIN_TIMEOUT, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}

/// Manual-mode state: the connector, the current stream (wrapped in an
/// [`IoWorker`] for the epoch), all driven synchronously by `tick()`.
struct ManualDriver {
    connector: Connector,
    worker: Option<IoWorker>,
}

impl ManualDriver {
    fn new() -> Self {
        Self {
            connector: Connector::new(),
            worker: None,
        }
    }

    /// One connection attempt plus one I/O cycle, mirroring a single
    /// iteration of each background loop.
    async fn cycle(&mut self, shared: &Arc<Shared>) {
        if self.worker.is_none() {
            if let Some(stream) = self.connector.attempt(shared).await {
                // Manual mode reuses the background worker's tick with the
                // period left to the host's own pacing.
                self.worker = Some(IoWorker::new(
                    stream,
                    shared.clone(),
                    Duration::ZERO,
                ));
            }
        }

        if let Some(worker) = self.worker.as_mut() {
            if let Err(e) = worker.tick().await {
                worker.log_failure(&e);
                if let Some(worker) = self.worker.take() {
                    worker.close();
                }
            }
        }
    }

    /// Drop the active epoch, if any.
    fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.close();
        }
    }
}
