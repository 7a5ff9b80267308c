//! Text codec for the discovery protocol.
//!
//! Wire format (UTF-8 text, one datagram per message):
//!
//! ```text
//! announce: Hey! I'm NITHphoneWrapper. I'm listening on this IP=<ip>&port=<port>
//! reply:    Hey! I'm the receiver. I have this IP=<ip>&port=<port>
//! ```
//!
//! Parsing is strict and returns typed errors.  The permissive fragment
//! locator used for log display lives in [`extract_fragment`] and is not part
//! of the wire contract: the responder replies to any marker-carrying
//! datagram whether or not a fragment (or even a well-formed key-value pair)
//! can be found in it.

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::protocol::messages::{AnnounceMessage, ReplyMessage, DISCOVERY_MARKER};

/// Fixed prefix of every reply payload.
pub const REPLY_PREFIX: &str = "Hey! I'm the receiver. I have this ";

/// Errors produced by the strict message parsers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The text does not contain the `NITHphoneWrapper` marker.
    #[error("missing discovery marker `{DISCOVERY_MARKER}`")]
    MissingMarker,

    /// The text does not carry the fixed reply prefix.
    #[error("not a receiver reply")]
    NotAReply,

    /// A required `key=` field is absent.
    #[error("missing `{0}=` field")]
    MissingField(&'static str),

    /// The `IP=` value is not a dotted-quad IPv4 address.
    #[error("invalid IPv4 address {0:?}")]
    InvalidIp(String),

    /// The `port=` value is not a decimal integer in `u16` range.
    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Renders the canonical announce payload.
pub fn encode_announce(msg: &AnnounceMessage) -> String {
    format!(
        "Hey! I'm {DISCOVERY_MARKER}. I'm listening on this IP={}&port={}",
        msg.ip, msg.port
    )
}

/// Renders the reply payload.  This is the exact datagram the responder sends
/// back to an announcer.
pub fn encode_reply(msg: &ReplyMessage) -> String {
    format!("{REPLY_PREFIX}IP={}&port={}", msg.ip, msg.port)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Returns `true` if `text` contains the discovery marker anywhere — prefix,
/// suffix, or middle.  This check alone gates whether the responder replies.
pub fn contains_marker(text: &str) -> bool {
    text.contains(DISCOVERY_MARKER)
}

/// Strictly parses an announce payload.
///
/// Requires the marker, an `IP=`/`ip=` key with a valid dotted-quad value,
/// and a `&port=` key with a valid decimal `u16`.
///
/// # Errors
///
/// Returns the [`ProtocolError`] variant naming the first requirement the
/// text fails.
pub fn decode_announce(text: &str) -> Result<AnnounceMessage, ProtocolError> {
    if !contains_marker(text) {
        return Err(ProtocolError::MissingMarker);
    }
    let (ip, port) = parse_key_values(text)?;
    Ok(AnnounceMessage { ip, port })
}

/// Strictly parses a reply payload.
///
/// Used by the announcer's real-world counterpart (the phone) and by
/// integration tests; the responder itself never parses replies.
///
/// # Errors
///
/// Returns [`ProtocolError::NotAReply`] when the fixed prefix is absent, or
/// the field-level variant for a malformed key-value pair.
pub fn decode_reply(text: &str) -> Result<ReplyMessage, ProtocolError> {
    if !text.starts_with(REPLY_PREFIX) {
        return Err(ProtocolError::NotAReply);
    }
    let (ip, port) = parse_key_values(text)?;
    Ok(ReplyMessage { ip, port })
}

/// Locates the key-value fragment of an inbound packet for log display.
///
/// Searches for `IP=` then `ip=`; failing both, falls back to the substring
/// starting after the last space before the first `&` (or the start of the
/// text).  Purely cosmetic: callers reply whether or not this finds anything,
/// and the returned slice is never validated.
pub fn extract_fragment(text: &str) -> Option<&str> {
    if let Some(idx) = find_ip_key(text) {
        return Some(&text[idx..]);
    }
    let amp = text.find('&')?;
    let start = text[..amp].rfind(' ').map(|i| i + 1).unwrap_or(0);
    Some(&text[start..])
}

// ── Parsing helpers ───────────────────────────────────────────────────────────

/// Byte offset of `IP=` (preferred) or `ip=` in `text`.
fn find_ip_key(text: &str) -> Option<usize> {
    text.find("IP=").or_else(|| text.find("ip="))
}

/// Parses the `IP=<ip>&port=<port>` pair out of `text`.
fn parse_key_values(text: &str) -> Result<(Ipv4Addr, u16), ProtocolError> {
    let idx = find_ip_key(text).ok_or(ProtocolError::MissingField("IP"))?;
    let after_key = &text[idx + "IP=".len()..];

    let amp = after_key
        .find('&')
        .ok_or(ProtocolError::MissingField("port"))?;
    let ip_raw = &after_key[..amp];
    let ip: Ipv4Addr = ip_raw
        .parse()
        .map_err(|_| ProtocolError::InvalidIp(ip_raw.to_string()))?;

    let port_raw = after_key[amp..]
        .strip_prefix("&port=")
        .ok_or(ProtocolError::MissingField("port"))?
        .trim_end();
    let port: u16 = port_raw
        .parse()
        .map_err(|_| ProtocolError::InvalidPort(port_raw.to_string()))?;

    Ok((ip, port))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
