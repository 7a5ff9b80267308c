//! UDP discovery responder.
//!
//! The responder binds a UDP socket on the discovery port (default 20500)
//! and answers any datagram carrying the `NITHphoneWrapper` marker.  On
//! receiving one, it:
//!
//! 1. Unicasts a reply containing this machine's IP and the configured
//!    announce port back to the datagram's source address.
//! 2. Emits a [`DiscoveryEvent`] on the internal channel so the application
//!    layer can log the exchange and track the peer.
//!
//! The loop runs as a blocking task on a dedicated thread to avoid tying up
//! the Tokio runtime with synchronous socket I/O.  One datagram is processed
//! to completion — reply send included — before the next receive; only one
//! exchange is ever in flight.
//!
//! # Identity asymmetry
//!
//! The reply always carries the responder's *own* resolved IP and configured
//! announce port.  Whatever `IP=`/`port=` values the sender claimed are used
//! for log display at most; they never flow into the reply.
//!
//! # Read timeout
//!
//! The protocol itself has no timeouts, acknowledgments, or retries.  The
//! short read timeout on the socket exists solely so the loop can poll the
//! `running` flag; on shutdown the loop exits and the socket is released
//! before the process ends.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use nith_core::{
    contains_marker, encode_reply, extract_fragment, ReplyMessage, DEFAULT_DISCOVERY_PORT,
    MAX_DATAGRAM_SIZE,
};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Error type for the discovery responder.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.  This is the only fatal error
    /// path: the responder never enters its loop.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable responder configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Port announced back to callers for the subsequent data stream.  This
    /// is an unrelated downstream channel; the responder never binds it.
    pub announce_port: u16,
    /// UDP port bound for discovery packets.
    pub discovery_port: u16,
    /// This machine's outbound-facing IPv4 address, resolved once at
    /// startup (see [`super::local_ip::resolve_local_ipv4`]).
    pub local_ip: Ipv4Addr,
}

impl ResponderConfig {
    /// Config with the default discovery port.
    pub fn new(announce_port: u16, local_ip: Ipv4Addr) -> Self {
        Self {
            announce_port,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            local_ip,
        }
    }
}

/// An event produced for every datagram that carried the discovery marker
/// and was answered.
#[derive(Debug, Clone)]
pub struct DiscoveryEvent {
    /// Source address the announce arrived from (and the reply went to).
    pub peer_addr: SocketAddr,
    /// Decoded text of the inbound datagram.
    pub text: String,
    /// Best-effort key-value fragment located in the text, for display only.
    pub fragment: Option<String>,
    /// The reply payload that was sent back.
    pub reply: String,
}

/// Binds a UDP socket on the configured discovery port and spawns a
/// background thread that answers incoming announce datagrams.
///
/// Returns a receiver from which the application layer reads
/// [`DiscoveryEvent`]s.  Clearing `running` stops the loop; the socket is
/// released when the thread exits.
///
/// # Errors
///
/// Returns [`DiscoveryError::BindFailed`] if the socket cannot be bound
/// (port in use, permission denied).
pub fn start_discovery_responder(
    config: ResponderConfig,
    running: Arc<AtomicBool>,
) -> Result<mpsc::Receiver<DiscoveryEvent>, DiscoveryError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.discovery_port));
    let socket = bind_reuse(addr)?;
    socket
        .set_read_timeout(Some(Duration::from_millis(500)))
        .ok();

    let (tx, rx) = mpsc::channel(64);

    std::thread::Builder::new()
        .name("nith-discovery".to_string())
        .spawn(move || {
            discovery_loop(socket, config, tx, running);
        })
        .expect("failed to spawn discovery thread");

    info!("discovery responder listening on UDP {addr}");
    Ok(rx)
}

/// Binds `addr` with `SO_REUSEADDR` set.
fn bind_reuse(addr: SocketAddr) -> Result<UdpSocket, DiscoveryError> {
    let bind = || -> std::io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        Ok(socket.into())
    };
    bind().map_err(|source| DiscoveryError::BindFailed { addr, source })
}

/// The main receive-and-reply loop executed on the discovery thread.
fn discovery_loop(
    socket: UdpSocket,
    config: ResponderConfig,
    tx: mpsc::Sender<DiscoveryEvent>,
    running: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                error!("discovery recv error: {e}");
                continue;
            }
        };

        // Undecodable byte sequences are substituted rather than rejected;
        // a garbled datagram simply fails the marker check below.
        let text = String::from_utf8_lossy(&buf[..len]).into_owned();
        info!("received from {src}: {text}");

        if !contains_marker(&text) {
            info!("ignoring non-discovery packet from {src}");
            continue;
        }

        let fragment = extract_fragment(&text).map(str::to_owned);
        let reply = encode_reply(&ReplyMessage {
            ip: config.local_ip,
            port: config.announce_port,
        });

        if let Err(e) = socket.send_to(reply.as_bytes(), src) {
            warn!("failed to send reply to {src}: {e}");
            continue;
        }
        info!("replied to {src} with {reply}");

        let event = DiscoveryEvent {
            peer_addr: src,
            text,
            fragment,
            reply,
        };
        if tx.blocking_send(event).is_err() {
            // Receiver dropped – application is shutting down.
            break;
        }
    }

    // Release the socket before `tx` drops: observers of the closed event
    // channel may immediately rebind the discovery port.
    drop(socket);
    info!("discovery responder stopped");
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
