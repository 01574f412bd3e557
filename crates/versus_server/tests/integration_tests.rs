//! End-to-end tests over real TCP sockets.
//!
//! Each test starts a server on an ephemeral localhost port and drives it
//! with plain `TcpStream` clients speaking the wire protocol.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration};
use versus_server::{create_server_with_config, GameServer, ServerConfig};

const PANEL_REPLY_LEN: usize = 1 + 120;

/// Helper to start a server on an ephemeral port
async fn start_server(max_connections: usize) -> (Arc<GameServer>, SocketAddr) {
    let config = ServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        max_connections,
        rng_seed: Some(7),
        ..ServerConfig::default()
    };
    let server = Arc::new(create_server_with_config(config));
    let listener = server.bind().expect("bind failed");
    let addr = listener.local_addr().unwrap();

    let running = server.clone();
    tokio::spawn(async move {
        running.serve(listener).await.expect("server failed");
    });
    (server, addr)
}

async fn read_bytes(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for server")
        .expect("read failed");
    buf
}

async fn assert_silent(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let result = timeout(Duration::from_millis(200), stream.read(&mut buf)).await;
    assert!(result.is_err(), "unexpected data from server: {:?}", buf);
}

async fn pair(addr: SocketAddr) -> (TcpStream, TcpStream) {
    let mut a = TcpStream::connect(addr).await.unwrap();
    a.write_all(b"H003").await.unwrap();
    assert_eq!(read_bytes(&mut a, 1).await, b"H");

    let mut b = TcpStream::connect(addr).await.unwrap();
    b.write_all(b"H003").await.unwrap();
    assert_eq!(read_bytes(&mut b, 1).await, b"G");
    assert_eq!(read_bytes(&mut a, 1).await, b"G");
    (a, b)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pair_and_relay_input() {
    let (_server, addr) = start_server(100).await;
    let (mut a, mut b) = pair(addr).await;

    a.write_all(b"Ix").await.unwrap();
    assert_eq!(read_bytes(&mut b, 2).await, b"Ix");

    b.write_all(b"L1").await.unwrap();
    assert_eq!(read_bytes(&mut a, 2).await, b"L1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_version_mismatch_then_retry() {
    let (_server, addr) = start_server(100).await;
    let mut a = TcpStream::connect(addr).await.unwrap();

    a.write_all(b"H002").await.unwrap();
    assert_eq!(read_bytes(&mut a, 1).await, b"N");

    a.write_all(b"H003").await.unwrap();
    assert_eq!(read_bytes(&mut a, 1).await, b"H");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fragmented_and_coalesced_frames() {
    let (_server, addr) = start_server(100).await;
    let mut a = TcpStream::connect(addr).await.unwrap();

    a.write_all(b"H0").await.unwrap();
    a.flush().await.unwrap();
    sleep(Duration::from_millis(50)).await;
    a.write_all(b"03").await.unwrap();
    assert_eq!(read_bytes(&mut a, 1).await, b"H");

    let mut b = TcpStream::connect(addr).await.unwrap();
    // Handshake and an input event in one write, with junk in between.
    b.write_all(b"H003zIq").await.unwrap();
    assert_eq!(read_bytes(&mut b, 1).await, b"G");
    assert_eq!(read_bytes(&mut a, 1).await, b"G");
    assert_eq!(read_bytes(&mut a, 2).await, b"Iq");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panel_request_reaches_both_players() {
    let (_server, addr) = start_server(100).await;
    let (mut a, mut b) = pair(addr).await;

    a.write_all(b"P5000000").await.unwrap();
    let own = read_bytes(&mut a, PANEL_REPLY_LEN).await;
    let theirs = read_bytes(&mut b, PANEL_REPLY_LEN).await;

    assert_eq!(own[0], b'P');
    assert_eq!(theirs[0], b'O');
    assert_eq!(own[1..], theirs[1..]);
    assert!(own[1..].iter().all(|&c| (b'0'..=b'9').contains(&c)));

    // The opponent's reset reuses the opening layout just cut.
    b.write_all(b"P5000000").await.unwrap();
    let rematch = read_bytes(&mut b, PANEL_REPLY_LEN).await;
    assert_eq!(rematch[0], b'P');
    assert_eq!(rematch[1..43], own[1..43]);
    assert_eq!(read_bytes(&mut a, 1).await, b"O");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_garbage_request_reaches_both_players() {
    let (_server, addr) = start_server(100).await;
    let (mut a, mut b) = pair(addr).await;

    a.write_all(b"Q3121212").await.unwrap();
    let own = read_bytes(&mut a, PANEL_REPLY_LEN).await;
    let theirs = read_bytes(&mut b, PANEL_REPLY_LEN).await;
    assert_eq!(own[0], b'Q');
    assert_eq!(theirs[0], b'R');
    assert_eq!(own[1..], theirs[1..]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_low_color_count_gets_no_reply() {
    let (_server, addr) = start_server(100).await;
    let (mut a, mut b) = pair(addr).await;

    a.write_all(b"P1000000").await.unwrap();
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_third_connection_waits() {
    let (_server, addr) = start_server(100).await;
    let (_a, _b) = pair(addr).await;

    let mut c = TcpStream::connect(addr).await.unwrap();
    c.write_all(b"H003").await.unwrap();
    assert_eq!(read_bytes(&mut c, 1).await, b"H");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_survivor_keeps_working_after_peer_left() {
    let (_server, addr) = start_server(100).await;
    let (mut a, b) = pair(addr).await;
    drop(b);

    a.write_all(b"Ix").await.unwrap();
    a.write_all(b"P4000000").await.unwrap();
    let own = read_bytes(&mut a, PANEL_REPLY_LEN).await;
    assert_eq!(own[0], b'P');
}

#[tokio::test(flavor = "multi_thread")]
async fn test_waiting_slot_freed_on_disconnect() {
    let (server, addr) = start_server(100).await;

    let mut a = TcpStream::connect(addr).await.unwrap();
    a.write_all(b"H003").await.unwrap();
    assert_eq!(read_bytes(&mut a, 1).await, b"H");
    drop(a);

    let manager = server.connection_manager();
    for _ in 0..100 {
        if manager.waiting().await.is_none() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(manager.waiting().await.is_none());

    let mut b = TcpStream::connect(addr).await.unwrap();
    b.write_all(b"H003").await.unwrap();
    assert_eq!(read_bytes(&mut b, 1).await, b"H");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_limit() {
    let (_server, addr) = start_server(2).await;
    let (_a, _b) = pair(addr).await;

    let mut c = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 1];
    let read = timeout(Duration::from_secs(5), c.read(&mut buf))
        .await
        .expect("refused connection was not closed");
    assert!(matches!(read, Ok(0) | Err(_)));
}
