//! One-shot discovery broadcast sender.
//!
//! Stand-in for the phone: sends a single conformant announce datagram to
//! the LAN broadcast address on the discovery port, then exits.  Useful for
//! validating a running responder without a phone on the network:
//!
//! ```bash
//! nith-announcer --port 21103
//! ```
//!
//! The responder does not depend on the claimed `--ip`/`--port` values being
//! meaningful; any marker-carrying text triggers its reply.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nith_core::{encode_announce, AnnounceMessage, DEFAULT_DISCOVERY_PORT};

/// Broadcasts one NITHphoneWrapper discovery announce, then exits.
#[derive(Debug, Parser)]
#[command(name = "nith-announcer", version)]
struct Cli {
    /// Port this sender claims to listen on for the data stream.
    #[arg(short = 'p', long)]
    port: u16,

    /// IPv4 address to claim; defaults to this machine's outbound address.
    #[arg(long)]
    ip: Option<Ipv4Addr>,

    /// Discovery port the broadcast is aimed at.
    #[arg(long, default_value_t = DEFAULT_DISCOVERY_PORT)]
    discovery_port: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let ip = cli.ip.unwrap_or_else(local_ipv4);

    let message = encode_announce(&AnnounceMessage { ip, port: cli.port });
    info!("sending broadcast: {message}");

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_broadcast(true)?;
    socket.send_to(
        message.as_bytes(),
        (Ipv4Addr::BROADCAST, cli.discovery_port),
    )?;

    info!(
        "broadcast sent to 255.255.255.255:{}",
        cli.discovery_port
    );
    Ok(())
}

/// Outbound-interface address via a routed-but-unsent UDP connect; loopback
/// when no route is available.
fn local_ipv4() -> Ipv4Addr {
    if let Ok(socket) = UdpSocket::bind("0.0.0.0:0") {
        if socket.connect("8.8.8.8:53").is_ok() {
            if let Ok(addr) = socket.local_addr() {
                if let IpAddr::V4(ip) = addr.ip() {
                    return ip;
                }
            }
        }
    }
    Ipv4Addr::LOCALHOST
}

// ── Tests ─────────────────────────────────────────────────────────────────────
