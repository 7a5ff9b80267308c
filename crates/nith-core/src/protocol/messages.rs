//! Discovery protocol message types.
//!
//! The wire format is UTF-8 text, one datagram = one message, no length
//! prefix.  A discovery packet is recognised by the literal marker substring
//! [`DISCOVERY_MARKER`]; anything else arriving on the discovery port is
//! ignored.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Marker substring identifying a discovery packet.  The responder replies to
/// any datagram containing it, wherever it appears in the text.
pub const DISCOVERY_MARKER: &str = "NITHphoneWrapper";

/// Default UDP port the responder binds for discovery broadcasts.
pub const DEFAULT_DISCOVERY_PORT: u16 = 20500;

/// Maximum datagram size read from the discovery socket.  Larger datagrams
/// are truncated by the socket layer; they get no special handling.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

// ── Message structs ───────────────────────────────────────────────────────────

/// ANNOUNCE: the phone broadcasts its presence and invites a reply.
///
/// The `ip`/`port` fields are the *sender's claim* about where it listens.
/// The responder never uses them to form its reply; it parses them only for
/// diagnostic display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceMessage {
    /// IPv4 address the sender claims to listen on.
    pub ip: Ipv4Addr,
    /// UDP port the sender claims to listen on.
    pub port: u16,
}

/// REPLY: the responder's own identity, unicast back to the announcer.
///
/// `ip` is the responder's outbound-facing address and `port` the announce
/// port it was configured with — never values taken from the inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// The responder's resolved local IPv4 address.
    pub ip: Ipv4Addr,
    /// The port the responder expects the subsequent data stream on.
    pub port: u16,
}
