//! Integration tests for the discovery responder.
//!
//! These exercise the responder end-to-end over real loopback UDP sockets,
//! the same way a phone on the LAN would: bind it on an ephemeral port, fire
//! datagrams at it, and observe what comes back.
//!
//! Covered properties:
//!
//! - A marker-carrying datagram gets exactly one reply, sent to the exact
//!   source address/port it came from.
//! - The reply carries the responder's *configured* identity, never values
//!   parsed out of the inbound packet.
//! - Non-marker and undecodable datagrams get no reply and do not stop later
//!   valid datagrams from being answered.
//! - Stopping the responder releases the discovery socket.

use std::net::UdpSocket;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use nith_core::{decode_reply, encode_announce, AnnounceMessage};
use nith_responder::infrastructure::network::{
    start_discovery_responder, DiscoveryEvent, ResponderConfig,
};
use tokio::sync::mpsc;

/// Reserves an ephemeral UDP port by binding port 0 and reading back the
/// OS-assigned number, then releasing it for the responder to claim.
fn free_udp_port() -> u16 {
    let probe = UdpSocket::bind("0.0.0.0:0").expect("probe bind");
    let port = probe.local_addr().unwrap().port();
    drop(probe);
    port
}

/// Starts a responder with a pinned local IP on a fresh port.
///
/// Returns the discovery port, the shutdown flag, and the event receiver.
fn start_test_responder(
    announce_port: u16,
    local_ip: &str,
) -> (u16, Arc<AtomicBool>, mpsc::Receiver<DiscoveryEvent>) {
    let port = free_udp_port();
    let config = ResponderConfig {
        announce_port,
        discovery_port: port,
        local_ip: local_ip.parse().unwrap(),
    };
    let running = Arc::new(AtomicBool::new(true));
    let events =
        start_discovery_responder(config, Arc::clone(&running)).expect("responder must bind");
    (port, running, events)
}

/// A loopback sender socket with a bounded read timeout.
fn sender_socket() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("sender bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    socket
}

#[test]
fn test_announce_gets_exactly_one_reply_with_responder_identity() {
    // Arrange – the end-to-end scenario: announce_port 21103, local IP
    // pinned to 192.168.1.50.
    let (port, running, mut events) = start_test_responder(21103, "192.168.1.50");
    let sender = sender_socket();

    let announce = encode_announce(&AnnounceMessage {
        ip: "192.168.1.100".parse().unwrap(),
        port: 21103,
    });

    // Act
    sender
        .send_to(announce.as_bytes(), ("127.0.0.1", port))
        .expect("send announce");

    // Assert – one reply, to this exact socket, from the discovery port.
    let mut buf = [0u8; 2048];
    let (len, from) = sender.recv_from(&mut buf).expect("reply must arrive");
    assert_eq!(from.port(), port, "reply must come from the discovery socket");

    let reply = std::str::from_utf8(&buf[..len])
        .expect("reply is UTF-8")
        .to_string();
    assert_eq!(
        reply,
        "Hey! I'm the receiver. I have this IP=192.168.1.50&port=21103"
    );

    // No second reply for a single announce.
    sender
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    assert!(
        sender.recv_from(&mut buf).is_err(),
        "must receive exactly one reply per announce"
    );

    // The event mirrors the exchange.
    let event = events.blocking_recv().expect("event must be emitted");
    assert_eq!(event.peer_addr, sender.local_addr().unwrap());
    assert!(event.text.contains("NITHphoneWrapper"));
    assert_eq!(event.reply, reply);

    running.store(false, Ordering::Relaxed);
}

#[test]
fn test_inbound_claims_do_not_leak_into_reply() {
    // Arrange – inbound claims IP=9.9.9.9&port=1; the reply must still carry
    // the configured identity.
    let (port, running, _events) = start_test_responder(21103, "192.168.1.50");
    let sender = sender_socket();

    // Act
    sender
        .send_to(
            b"Hey! I'm NITHphoneWrapper. I'm listening on this IP=9.9.9.9&port=1",
            ("127.0.0.1", port),
        )
        .expect("send announce");

    // Assert
    let mut buf = [0u8; 2048];
    let (len, _) = sender.recv_from(&mut buf).expect("reply must arrive");
    let reply = decode_reply(std::str::from_utf8(&buf[..len]).unwrap()).expect("parse reply");
    assert_eq!(reply.ip, "192.168.1.50".parse::<std::net::Ipv4Addr>().unwrap());
    assert_eq!(reply.port, 21103);

    running.store(false, Ordering::Relaxed);
}

#[test]
fn test_marker_position_does_not_matter() {
    // The marker check is a plain substring search: prefix, suffix, and
    // middle placements must all be answered.
    let (port, running, _events) = start_test_responder(7000, "10.0.0.5");
    let sender = sender_socket();
    let mut buf = [0u8; 2048];

    for text in [
        "NITHphoneWrapper leading",
        "trailing NITHphoneWrapper",
        "in the NITHphoneWrapper middle",
    ] {
        sender
            .send_to(text.as_bytes(), ("127.0.0.1", port))
            .expect("send");
        let (len, _) = sender
            .recv_from(&mut buf)
            .unwrap_or_else(|_| panic!("no reply for {text:?}"));
        assert!(std::str::from_utf8(&buf[..len]).unwrap().contains("port=7000"));
    }

    running.store(false, Ordering::Relaxed);
}

#[test]
fn test_non_discovery_packet_gets_no_reply() {
    // Arrange
    let (port, running, _events) = start_test_responder(21103, "192.168.1.50");
    let sender = sender_socket();
    sender
        .set_read_timeout(Some(Duration::from_millis(400)))
        .unwrap();

    // Act
    sender
        .send_to(b"ping", ("127.0.0.1", port))
        .expect("send ping");

    // Assert – zero replies.
    let mut buf = [0u8; 2048];
    assert!(
        sender.recv_from(&mut buf).is_err(),
        "a packet without the marker must not be answered"
    );

    running.store(false, Ordering::Relaxed);
}

#[test]
fn test_malformed_datagram_does_not_stop_the_loop() {
    // Arrange
    let (port, running, _events) = start_test_responder(21103, "192.168.1.50");
    let sender = sender_socket();

    // Act – an invalid UTF-8 datagram, then a valid announce.
    sender
        .send_to(&[0xFF, 0xFE, 0x00, 0x9F], ("127.0.0.1", port))
        .expect("send garbage");
    sender
        .send_to(
            b"Hey! I'm NITHphoneWrapper. I'm listening on this IP=192.168.1.100&port=21103",
            ("127.0.0.1", port),
        )
        .expect("send announce");

    // Assert – the valid announce is still answered.
    let mut buf = [0u8; 2048];
    let (len, _) = sender
        .recv_from(&mut buf)
        .expect("valid announce after garbage must still be answered");
    assert!(std::str::from_utf8(&buf[..len])
        .unwrap()
        .starts_with("Hey! I'm the receiver."));

    running.store(false, Ordering::Relaxed);
}

#[test]
fn test_shutdown_releases_the_discovery_socket() {
    // Arrange
    let (port, running, mut events) = start_test_responder(21103, "192.168.1.50");

    // Act – stop the responder and wait for the loop to exit (the event
    // channel closes when the discovery thread drops its sender).
    running.store(false, Ordering::Relaxed);
    while events.blocking_recv().is_some() {}

    // Assert – the port can be bound again.
    UdpSocket::bind(("0.0.0.0", port))
        .expect("discovery port must be released after shutdown");
}
