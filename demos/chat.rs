//! Interactive chat between two socket-serial endpoints.
//!
//! Start a server in one terminal and a client in another:
//!
//! ```text
//! cargo run --example chat -- server 127.0.0.1 9000
//! cargo run --example chat -- client 127.0.0.1 9000
//! ```
//!
//! Lines typed on stdin are queued for transmission; received messages are
//! printed as they are drained. Either side can be restarted; the peer
//! reconnects automatically.

use std::time::Duration;

use socket_serial::{ConnectOptions, Drain, Role, SocketSerial};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let role = match args.next().as_deref() {
        Some("server") => Role::Server,
        Some("client") => Role::Client,
        _ => {
            eprintln!("usage: chat <server|client> [address] [port]");
            std::process::exit(1);
        }
    };
    let address = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().unwrap_or_else(|| "9000".to_string()).parse()?;

    let channel = SocketSerial::builder(address, port)
        .role(role)
        .log_errors(true)
        .build();

    println!("waiting for peer...");
    channel
        .connect(ConnectOptions::default().blocking().auto_reconnect())
        .await;
    println!("connected. type a message and press enter; ctrl-d quits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if !line.trim().is_empty() => channel.send(line),
                Some(_) => {}
                None => break,
            },
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                for message in channel.receive(Drain::All) {
                    println!("peer: {}", message);
                }
            }
        }
    }

    channel.disconnect().await;
    Ok(())
}
