//! Relay server driven from stdin
//!
//! Run with: cargo run --example relay_server -- [--bind ADDR] [--config FILE]
//!
//! Every line typed on stdin becomes an inbound message:
//!
//! ```text
//!   wxid_alice hello                        # direct message from wxid_alice
//!   123@chatroom wxid_bob good morning      # group message in 123@chatroom
//! ```
//!
//! ## Subscribing
//!
//! With curl:
//!   curl -N http://localhost:8000/subscribe
//!
//! Counters:
//!   curl http://localhost:8000/stats

use std::io::BufRead;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use wcf_relay::{LoopbackClient, LoopbackFeeder, RawMessage, Relay, RelayServer, Settings};

#[derive(Parser, Debug)]
#[command(name = "relay_server", about = "Relay stdin messages to SSE subscribers")]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the settings
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Account id the loopback client reports
    #[arg(long, default_value = "wxid_relay")]
    wxid: String,
}

/// Turn one stdin line into a raw message
fn parse_line(id: u64, line: &str) -> Option<RawMessage> {
    let (first, rest) = line.trim().split_once(' ')?;
    if first.ends_with("@chatroom") {
        let (sender, content) = rest.split_once(' ')?;
        Some(RawMessage::group_text(id, first, sender, content))
    } else {
        Some(RawMessage::text(id, first, rest))
    }
}

/// Feed stdin into the client until EOF
fn spawn_stdin_feeder(feeder: LoopbackFeeder) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-feeder".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for (n, line) in stdin.lock().lines().enumerate() {
                let Ok(line) = line else { break };
                match parse_line(n as u64 + 1, &line) {
                    Some(msg) => {
                        if !feeder.push(msg) {
                            break;
                        }
                    }
                    None => eprintln!("expected: <sender|room@chatroom sender> <content>"),
                }
            }
            tracing::info!("stdin closed");
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wcf_relay=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    let mut server_config = settings.server_config();
    if let Some(bind) = args.bind {
        server_config = server_config.bind(bind);
    }

    let (client, feeder) = LoopbackClient::with_wxid(args.wxid);
    let relay = Arc::new(Relay::start(Arc::new(client), settings.relay_config())?);
    spawn_stdin_feeder(feeder)?;

    println!("Relaying stdin to http://{}/subscribe", server_config.bind_addr);
    println!();

    let server = RelayServer::new(server_config, Arc::clone(&relay));
    let result = server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    let report = relay.shutdown().await;
    println!(
        "Receiver exit: {:?}, subscribers dropped: {}",
        report.receiver_exit, report.subscribers_dropped
    );

    result?;
    Ok(())
}
