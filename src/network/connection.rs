//! Connection
//!
//! Owns one TCP socket to a cluster node and runs request/response exchanges
//! over it.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::error::{IgniteError, Result};
use crate::protocol::{HandshakeRequest, HandshakeResponse, ProtocolVersion, Request, Response};
use super::LeakHook;

/// Lifecycle of a connection
///
/// `Connecting → HandshakeSent → Connected → Closed`, or
/// `Connecting → HandshakeSent → Failed`. Failed and Closed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    HandshakeSent = 1,
    Connected = 2,
    Failed = 3,
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::HandshakeSent,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Failed,
            _ => ConnectionState::Closed,
        }
    }
}

/// A live connection to one server
///
/// ## Concurrency
/// The connection is shared by reference (or `Arc`) between any number of
/// callers. `exchange` holds `gate` for the whole write-then-read, so at most
/// one exchange is in flight and responses always pair with their requests.
/// `close` takes the same gate: a close racing an exchange waits for the
/// exchange to finish, then closes.
pub struct Connection {
    /// Human-readable identity for logs and leak reports
    debug_id: String,

    /// Exclusive-access gate around the socket; `None` once closed
    gate: Mutex<Option<TcpStream>>,

    /// Mirrors `gate.is_some()` without taking the lock
    connected: AtomicBool,

    state: AtomicU8,

    max_frame_size: usize,

    leak_hook: LeakHook,
}

impl Connection {
    /// Dial the server described by `config` and perform the handshake
    ///
    /// Returns a connection in the `Connected` state, or the transport or
    /// handshake error that stopped it. On handshake failure the socket is
    /// already closed.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let addrs = resolve(config)?;
        let debug_id = format!(
            "network='{}', address='{}'",
            config.network,
            config.address()
        );

        tracing::debug!("Connecting to {}", debug_id);
        let stream = dial(&addrs, config.connect_timeout_ms)?;
        configure(&stream, config).map_err(|e| IgniteError::transport("configure socket", e))?;

        let conn = Self {
            debug_id,
            gate: Mutex::new(Some(stream)),
            connected: AtomicBool::new(true),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            max_frame_size: config.max_frame_size,
            leak_hook: config.leak_hook.clone(),
        };

        conn.handshake(config.version)?;
        Ok(conn)
    }

    /// Connect, run `f`, and close on every exit path
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn scoped<T>(
        config: &ClientConfig,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let conn = Connection::connect(config)?;
        let result = f(&conn);
        let closed = conn.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    fn handshake(&self, version: ProtocolVersion) -> Result<()> {
        let request = HandshakeRequest::new(version);
        let mut response = HandshakeResponse::default();

        self.set_state(ConnectionState::HandshakeSent);
        tracing::debug!("Handshake sent to {} requesting v{}", self.debug_id, version);

        if let Err(e) = self.exchange(&request, &mut response) {
            tracing::warn!("Handshake with {} failed: {}", self.debug_id, e);
            self.fail();
            return Err(e);
        }

        if let Err(e) = response.into_result() {
            tracing::warn!("Handshake rejected by {}: {}", self.debug_id, e);
            self.fail();
            return Err(e);
        }

        self.set_state(ConnectionState::Connected);
        tracing::debug!("Connected to {} using protocol v{}", self.debug_id, version);
        Ok(())
    }

    /// Write `request`, then read `response`, as one exclusive step
    ///
    /// Transport failures tear the socket down; later calls get
    /// [`IgniteError::NotConnected`]. Decode and server errors leave the
    /// socket open since the whole frame has been consumed.
    pub fn exchange(&self, request: &dyn Request, response: &mut dyn Response) -> Result<()> {
        // Held until the response has been read
        let mut gate = self.gate.lock();

        let stream = gate.as_mut().ok_or_else(|| {
            IgniteError::NotConnected(format!(
                "cannot send {} over closed connection {}",
                request.name(),
                self.debug_id
            ))
        })?;

        let outcome = match request.write_to(&mut *stream) {
            Ok(written) => response
                .read_from(&mut *stream, self.max_frame_size)
                .map(|read| (written, read)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((written, read)) => {
                tracing::trace!(
                    "{}: {} sent {} bytes, received {} bytes",
                    self.debug_id,
                    request.name(),
                    written,
                    read
                );
                Ok(())
            }
            Err(e) => {
                if matches!(e, IgniteError::Transport { .. } | IgniteError::Io(_)) {
                    tracing::warn!(
                        "{}: {} failed, dropping connection: {}",
                        self.debug_id,
                        request.name(),
                        e
                    );
                    if let Some(stream) = gate.take() {
                        let _ = stream.shutdown(Shutdown::Both);
                    }
                    self.connected.store(false, Ordering::Release);
                    self.set_state(ConnectionState::Closed);
                }
                Err(e)
            }
        }
    }

    /// True while the socket is held
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Release the socket. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut gate = self.gate.lock();
        let Some(stream) = gate.take() else {
            return Ok(());
        };

        self.connected.store(false, Ordering::Release);
        if self.state() != ConnectionState::Failed {
            self.set_state(ConnectionState::Closed);
        }
        tracing::debug!("Connection {} closed", self.debug_id);

        match stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already went away
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(IgniteError::transport("close connection", e)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Identity string used in logs
    pub fn debug_id(&self) -> &str {
        &self.debug_id
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn fail(&self) {
        self.set_state(ConnectionState::Failed);
        if let Err(e) = self.close() {
            tracing::debug!("Error closing failed connection {}: {}", self.debug_id, e);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.connected() {
            self.leak_hook.notify(&self.debug_id);
            if let Err(e) = self.close() {
                tracing::debug!("Error closing leaked connection {}: {}", self.debug_id, e);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("debug_id", &self.debug_id)
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Dialing
// =============================================================================

/// Resolve the configured host, keeping only addresses of the requested family
fn resolve(config: &ClientConfig) -> Result<Vec<SocketAddr>> {
    let wanted: fn(&SocketAddr) -> bool = match config.network.as_str() {
        "tcp" => |_| true,
        "tcp4" => SocketAddr::is_ipv4,
        "tcp6" => SocketAddr::is_ipv6,
        other => {
            return Err(IgniteError::Config(format!(
                "unsupported network family: {}",
                other
            )))
        }
    };

    let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|e| IgniteError::transport("resolve address", e))?
        .filter(|addr| wanted(addr))
        .collect();

    if addrs.is_empty() {
        return Err(IgniteError::Config(format!(
            "no {} address found for {}",
            config.network,
            config.address()
        )));
    }
    Ok(addrs)
}

/// Try each address in turn; the last failure wins
fn dial(addrs: &[SocketAddr], timeout_ms: u64) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        let attempt = if timeout_ms > 0 {
            TcpStream::connect_timeout(addr, Duration::from_millis(timeout_ms))
        } else {
            TcpStream::connect(addr)
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Dial {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    let err = last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address to dial"));
    Err(IgniteError::transport("open connection", err))
}

fn configure(stream: &TcpStream, config: &ClientConfig) -> io::Result<()> {
    stream.set_nodelay(config.nodelay)?;
    if config.read_timeout_ms > 0 {
        stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
    }
    if config.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
    }
    Ok(())
}
