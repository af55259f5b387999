//! Configuration for ignite-client
//!
//! Centralized configuration with sensible defaults.

use crate::network::LeakHook;
use crate::protocol::{ProtocolVersion, DEFAULT_MAX_FRAME_SIZE};

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------
    /// Network family: "tcp", "tcp4" or "tcp6"
    pub network: String,

    /// Server host name or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Dial timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Socket read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Disable Nagle's algorithm
    pub nodelay: bool,

    // -------------------------------------------------------------------------
    // Protocol
    // -------------------------------------------------------------------------
    /// Protocol version requested in the handshake
    pub version: ProtocolVersion,

    /// Largest response payload accepted (bytes)
    pub max_frame_size: usize,

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------
    /// Invoked when a connection is dropped without being closed
    pub leak_hook: LeakHook,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: "tcp".to_string(),
            host: "127.0.0.1".to_string(),
            port: 10800,
            connect_timeout_ms: 5000,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            nodelay: true,
            version: ProtocolVersion::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            leak_hook: LeakHook::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// `host:port` as used for dialing
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the network family ("tcp", "tcp4", "tcp6")
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.config.network = network.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the protocol version requested in the handshake
    pub fn version(mut self, major: i16, minor: i16, patch: i16) -> Self {
        self.config.version = ProtocolVersion::new(major, minor, patch);
        self
    }

    /// Set the dial timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Set the largest accepted response payload (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Replace the leak diagnostic hook
    pub fn leak_hook(mut self, hook: LeakHook) -> Self {
        self.config.leak_hook = hook;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
