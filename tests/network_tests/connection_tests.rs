//! Tests for Connection
//!
//! These tests verify:
//! - Handshake success and failure against a loopback server
//! - Close idempotence and use-after-close
//! - Leak reporting on drop
//! - Exclusive exchanges under concurrent use
//! - Transport failure handling

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use ignite_client::protocol::{
    encode_frame, BinaryWriter, OpCode, OperationRequest, OperationResponse, RawResponse,
};
use ignite_client::{ClientConfig, Connection, ConnectionState, IgniteError, LeakHook};

// =============================================================================
// Fake Server
// =============================================================================

fn read_payload(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).ok()?;
    let mut payload = vec![0u8; i32::from_le_bytes(prefix) as usize];
    stream.read_exact(&mut payload).ok()?;
    Some(payload)
}

fn write_payload(stream: &mut TcpStream, payload: &[u8]) {
    stream.write_all(&encode_frame(payload).unwrap()).unwrap();
}

fn handshake_ok() -> Vec<u8> {
    vec![1]
}

fn handshake_rejected(major: i16, minor: i16, patch: i16, message: &str) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    w.write_byte(0);
    w.write_short(major);
    w.write_short(minor);
    w.write_short(patch);
    w.write_ostring(message).unwrap();
    w.as_slice().to_vec()
}

/// Accept one client, answer its handshake with `reply`, then hand the socket to `serve`
///
/// The received handshake payload is sent on the returned channel.
fn spawn_server<F>(reply: Vec<u8>, serve: F) -> (u16, mpsc::Receiver<Vec<u8>>, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let handshake = read_payload(&mut stream).unwrap();
        tx.send(handshake).unwrap();
        write_payload(&mut stream, &reply);
        serve(stream);
    });

    (port, rx, handle)
}

/// Answer every operation with status 0 and the request body echoed back
fn echo(mut stream: TcpStream) {
    while let Some(payload) = read_payload(&mut stream) {
        let mut w = BinaryWriter::new();
        w.write_raw(&payload[2..10]);
        w.write_int(0);
        w.write_raw(&payload[10..]);
        write_payload(&mut stream, w.as_slice());
    }
}

fn config(port: u16) -> ClientConfig {
    ClientConfig::builder()
        .network("tcp4")
        .host("127.0.0.1")
        .port(port)
        .read_timeout_ms(5000)
        .leak_hook(LeakHook::silent())
        .build()
}

fn counting_hook() -> (LeakHook, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let hook = LeakHook::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (hook, count)
}

fn echo_exchange(conn: &Connection, request_id: i64) -> ignite_client::Result<i64> {
    let mut request = OperationRequest::new(OpCode::CacheGet, request_id);
    request.body_mut().write_long(request_id * 10);
    let mut response = OperationResponse::new(request_id);
    conn.exchange(&request, &mut response)?;
    response.body().read_long()
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[test]
fn test_connect_sends_handshake() {
    let (port, handshakes, server) = spawn_server(handshake_ok(), echo);

    let conn = Connection::connect(&config(port)).unwrap();
    assert!(conn.connected());
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert_eq!(
        conn.debug_id(),
        format!("network='tcp4', address='127.0.0.1:{}'", port)
    );

    assert_eq!(handshakes.recv().unwrap(), vec![1, 1, 0, 0, 0, 0, 0, 2]);

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn test_connect_requests_configured_version() {
    let (port, handshakes, server) = spawn_server(handshake_ok(), echo);

    let mut cfg = config(port);
    cfg.version = ignite_client::ProtocolVersion::new(1, 1, 0);
    let conn = Connection::connect(&cfg).unwrap();

    assert_eq!(handshakes.recv().unwrap(), vec![1, 1, 0, 1, 0, 0, 0, 2]);
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn test_handshake_rejected() {
    let reply = handshake_rejected(1, 2, 0, "Unsupported version.");
    let (port, _handshakes, server) = spawn_server(reply, echo);
    let (hook, leaks) = counting_hook();

    let mut cfg = config(port);
    cfg.leak_hook = hook;
    let err = Connection::connect(&cfg).unwrap_err();

    match err {
        IgniteError::Handshake {
            major,
            minor,
            patch,
            message,
        } => {
            assert_eq!((major, minor, patch), (1, 2, 0));
            assert_eq!(message, "Unsupported version.");
        }
        other => panic!("Expected handshake error, got {:?}", other),
    }

    // Socket was closed before the error was returned
    assert_eq!(leaks.load(Ordering::SeqCst), 0);
    server.join().unwrap();
}

#[test]
fn test_server_hangs_up_during_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_payload(&mut stream);
    });

    let err = Connection::connect(&config(port)).unwrap_err();
    assert!(matches!(err, IgniteError::Transport { .. }), "{:?}", err);
    server.join().unwrap();
}

#[test]
fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = Connection::connect(&config(port)).unwrap_err();
    assert!(matches!(err, IgniteError::Transport { .. }), "{:?}", err);
}

#[test]
fn test_unknown_network_family() {
    let cfg = ClientConfig::builder().network("udp").port(1).build();
    let err = Connection::connect(&cfg).unwrap_err();
    assert!(matches!(err, IgniteError::Config(_)));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_is_idempotent() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let conn = Connection::connect(&config(port)).unwrap();

    conn.close().unwrap();
    assert!(!conn.connected());
    assert_eq!(conn.state(), ConnectionState::Closed);

    conn.close().unwrap();
    assert!(!conn.connected());
    server.join().unwrap();
}

#[test]
fn test_exchange_after_close() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let conn = Connection::connect(&config(port)).unwrap();
    conn.close().unwrap();

    let err = echo_exchange(&conn, 1).unwrap_err();
    assert!(matches!(err, IgniteError::NotConnected(_)));
    server.join().unwrap();
}

#[test]
fn test_drop_without_close_reports_leak_once() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let (hook, leaks) = counting_hook();

    let mut cfg = config(port);
    cfg.leak_hook = hook;
    let conn = Connection::connect(&cfg).unwrap();
    drop(conn);

    assert_eq!(leaks.load(Ordering::SeqCst), 1);
    // Leaked socket is still closed, so the server sees EOF
    server.join().unwrap();
}

#[test]
fn test_drop_after_close_is_silent() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let (hook, leaks) = counting_hook();

    let mut cfg = config(port);
    cfg.leak_hook = hook;
    let conn = Connection::connect(&cfg).unwrap();
    conn.close().unwrap();
    drop(conn);

    assert_eq!(leaks.load(Ordering::SeqCst), 0);
    server.join().unwrap();
}

#[test]
fn test_scoped_closes_on_error() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let (hook, leaks) = counting_hook();

    let mut cfg = config(port);
    cfg.leak_hook = hook;
    let result: ignite_client::Result<()> = Connection::scoped(&cfg, |conn| {
        assert_eq!(echo_exchange(conn, 5)?, 50);
        Err(IgniteError::Config("stop".to_string()))
    });

    assert!(matches!(result, Err(IgniteError::Config(_))));
    assert_eq!(leaks.load(Ordering::SeqCst), 0);
    server.join().unwrap();
}

// =============================================================================
// Exchange Tests
// =============================================================================

#[test]
fn test_exchange_round_trip() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let conn = Connection::connect(&config(port)).unwrap();

    assert_eq!(echo_exchange(&conn, 1).unwrap(), 10);
    assert_eq!(echo_exchange(&conn, 2).unwrap(), 20);

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn test_concurrent_exchanges_do_not_interleave() {
    const THREADS: i64 = 8;
    const PER_THREAD: i64 = 50;

    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let conn = Arc::new(Connection::connect(&config(port)).unwrap());

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let conn = Arc::clone(&conn);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let id = t * PER_THREAD + i + 1;
                    // A mismatched request id would fail with a decode error
                    assert_eq!(echo_exchange(&conn, id).unwrap(), id * 10);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn test_server_error_keeps_connection_open() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), |mut stream| {
        let payload = read_payload(&mut stream).unwrap();
        let mut w = BinaryWriter::new();
        w.write_raw(&payload[2..10]);
        w.write_int(1);
        w.write_ostring("Cache does not exist: missing").unwrap();
        write_payload(&mut stream, w.as_slice());
        echo(stream);
    });
    let conn = Connection::connect(&config(port)).unwrap();

    let err = echo_exchange(&conn, 1).unwrap_err();
    match err {
        IgniteError::Server { status, message } => {
            assert_eq!(status, 1);
            assert_eq!(message, "Cache does not exist: missing");
        }
        other => panic!("Expected server error, got {:?}", other),
    }

    assert!(conn.connected());
    assert_eq!(echo_exchange(&conn, 2).unwrap(), 20);

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn test_request_id_mismatch_is_decode_error() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), |mut stream| {
        read_payload(&mut stream).unwrap();
        let mut w = BinaryWriter::new();
        w.write_long(999);
        w.write_int(0);
        write_payload(&mut stream, w.as_slice());
        echo(stream);
    });
    let conn = Connection::connect(&config(port)).unwrap();

    let err = echo_exchange(&conn, 1).unwrap_err();
    assert!(matches!(err, IgniteError::Decode(_)));
    assert!(!err.is_fatal());

    assert!(conn.connected());
    assert_eq!(echo_exchange(&conn, 2).unwrap(), 20);

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn test_peer_hangup_drops_connection() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), |mut stream| {
        read_payload(&mut stream);
    });
    let conn = Connection::connect(&config(port)).unwrap();

    let err = echo_exchange(&conn, 1).unwrap_err();
    assert!(matches!(err, IgniteError::Transport { .. }), "{:?}", err);
    assert!(err.is_fatal());
    assert!(!conn.connected());

    let err = echo_exchange(&conn, 2).unwrap_err();
    assert!(matches!(err, IgniteError::NotConnected(_)));
    assert!(err.is_fatal());

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn test_raw_response_exposes_payload() {
    let (port, _handshakes, server) = spawn_server(handshake_ok(), echo);
    let conn = Connection::connect(&config(port)).unwrap();

    let mut request = OperationRequest::new(OpCode::CacheGetNames, 77);
    request.body_mut().write_byte(5);
    let mut response = RawResponse::new();
    conn.exchange(&request, &mut response).unwrap();

    let body = response.into_body();
    assert_eq!(body.as_slice(), &[77, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5]);

    conn.close().unwrap();
    server.join().unwrap();
}
