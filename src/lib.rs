//! # ignite-client
//!
//! Client for the binary thin-client protocol of an Ignite cluster:
//! - Type-tagged little-endian value codec
//! - Length-prefixed request/response framing
//! - Version handshake on connect
//! - Serialized request/response exchanges over one TCP socket
//! - Cache management and key-value operations
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Client                              │
//! │          (cache ops, request ids, cache id hashing)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Connection                            │
//! │         (handshake, exchange gate, leak detection)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Frame    │          │    Codec    │
//!   │ (len + body)│          │  (values)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod cache;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{IgniteError, Result};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use client::Client;
pub use network::{Connection, ConnectionState, LeakHook};
pub use protocol::{ProtocolVersion, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
