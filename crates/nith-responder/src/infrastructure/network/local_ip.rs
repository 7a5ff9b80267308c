//! Outbound-facing local IPv4 address resolution.
//!
//! `connect` on a UDP socket sends no packets; it only asks the OS to pick a
//! route, and the socket's local address then reveals the interface that
//! general internet-bound traffic would leave from.  When resolution fails
//! for any reason (no interface, no route, permission error) the responder
//! degrades to the loopback address instead of failing — discovery still
//! works against a peer on the same host.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use tracing::debug;

/// Address used only for route selection; no datagram is ever sent to it.
const PROBE_ADDR: &str = "8.8.8.8:53";

/// Resolves the IPv4 address of the interface the OS routes outbound traffic
/// through, falling back to `127.0.0.1` when resolution fails.
pub fn resolve_local_ipv4() -> Ipv4Addr {
    match try_resolve() {
        Some(ip) => ip,
        None => {
            debug!("local IP resolution failed; falling back to loopback");
            Ipv4Addr::LOCALHOST
        }
    }
}

fn try_resolve() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(PROBE_ADDR).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(_) => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
