//! Error types for ignite-client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using IgniteError
pub type Result<T> = std::result::Result<T, IgniteError>;

/// Unified error type for ignite-client operations
#[derive(Debug, Error)]
pub enum IgniteError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dial failure, short read/write, reset. The connection is unusable.
    #[error("Transport error: failed to {op}: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Operation attempted on a closed connection
    #[error("Not connected: {0}")]
    NotConnected(String),

    // -------------------------------------------------------------------------
    // Handshake Errors
    // -------------------------------------------------------------------------
    #[error("Handshake failed: {message}, server supported protocol version is v{major}.{minor}.{patch}")]
    Handshake {
        major: i16,
        minor: i16,
        patch: i16,
        message: String,
    },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    #[error("Server error (status {status}): {message}")]
    Server { status: i32, message: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IgniteError {
    /// Wrap an I/O error raised while talking to the socket
    pub fn transport(op: &'static str, source: std::io::Error) -> Self {
        IgniteError::Transport { op, source }
    }

    /// True if the connection must be re-established after this error.
    ///
    /// Decode and server errors are raised after a whole frame has been
    /// consumed, so the stream stays aligned and the connection stays open.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IgniteError::Io(_)
                | IgniteError::Transport { .. }
                | IgniteError::NotConnected(_)
                | IgniteError::Handshake { .. }
        )
    }
}
