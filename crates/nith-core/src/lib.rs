//! # nith-core
//!
//! Shared library for the NITH discovery exchange: protocol message types
//! and the text codec used by both the responder and the announcer.
//!
//! This crate has zero dependencies on sockets or OS APIs.
//!
//! # How the discovery exchange works (for beginners)
//!
//! The NITHphoneWrapper phone app and its PC-side receiver find each other on
//! a local network without any configuration:
//!
//! 1. The phone sends a single UDP packet to the LAN broadcast address on the
//!    discovery port (default 20500).  Every device on the LAN receives it.
//!
//! 2. The PC responder is listening on that port.  It recognises the packet
//!    by the `NITHphoneWrapper` marker substring and unicasts a reply back to
//!    the packet's source address.
//!
//! 3. The reply carries the PC's own IP and the port it expects head-tracking
//!    data on.  The phone now knows where to stream — the stream itself is a
//!    separate channel outside this crate.
//!
//! There is no negotiation, no retry layer, and no session state: the whole
//! protocol is one request and one reply, both plain text.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `nith_core::encode_reply` instead of `nith_core::protocol::codec::encode_reply`.
pub use protocol::codec::{
    contains_marker, decode_announce, decode_reply, encode_announce, encode_reply,
    extract_fragment, ProtocolError,
};
pub use protocol::messages::{
    AnnounceMessage, ReplyMessage, DEFAULT_DISCOVERY_PORT, DISCOVERY_MARKER, MAX_DATAGRAM_SIZE,
};
