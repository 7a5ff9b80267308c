//! NITH discovery responder entry point.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()                  -- announce port (required), discovery port
//!  └─ resolve_local_ipv4()          -- loopback fallback on failure
//!  └─ start_discovery_responder()   -- UDP loop on a background thread
//!  └─ event pump                    -- logs exchanges, tracks peers
//! ```
//!
//! Runs until interrupted (Ctrl-C).  A bind failure on the discovery port is
//! the only fatal error: it is reported and the process exits cleanly without
//! entering the loop.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nith_core::DEFAULT_DISCOVERY_PORT;
use nith_responder::application::track_peers::PeerTracker;
use nith_responder::infrastructure::network::{
    resolve_local_ipv4, start_discovery_responder, ResponderConfig,
};

/// Replies to NITHphoneWrapper discovery broadcasts with this machine's IP
/// and the port it expects head-tracking data on.
#[derive(Debug, Parser)]
#[command(name = "nith-responder", version)]
struct Cli {
    /// Port where this machine listens for head-tracking UDP data
    /// (announced back to the phone; not bound by this process).
    #[arg(short = 'p', long)]
    announce_port: u16,

    /// UDP port to bind for discovery broadcasts.
    #[arg(long, default_value_t = DEFAULT_DISCOVERY_PORT)]
    discovery_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let local_ip = resolve_local_ipv4();
    info!("local IP: {local_ip} (will announce this to phones)");

    let config = ResponderConfig {
        announce_port: cli.announce_port,
        discovery_port: cli.discovery_port,
        local_ip,
    };

    // Shutdown flag shared with the discovery thread.
    let running = Arc::new(AtomicBool::new(true));

    let mut events = match start_discovery_responder(config, Arc::clone(&running)) {
        Ok(rx) => rx,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    // Flips the flag; the discovery thread notices on its next timeout tick,
    // exits its loop, and releases the socket.
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("NITH discovery responder ready.  Press Ctrl-C to exit.");

    // ── Discovery event pump ──────────────────────────────────────────────────
    // Ends when the discovery thread exits and drops its sender.
    let mut tracker = PeerTracker::new();
    while let Some(event) = events.recv().await {
        if let Some(fragment) = &event.fragment {
            info!("announce fields from {}: {fragment}", event.peer_addr);
        }
        let seen = tracker.record_announce(event.peer_addr, &event.text);
        info!(
            "peer {} has announced {seen} time(s); {} peer(s) seen this run",
            event.peer_addr,
            tracker.peer_count()
        );
    }

    info!("NITH discovery responder stopped");
    Ok(())
}
