//! Network Module
//!
//! TCP connection handling.
//!
//! ## Architecture
//! - One socket per [`Connection`], dialed and handshaken by `connect`
//! - One exchange in flight per connection, serialized by a gate
//! - Leaked connections reported through a [`LeakHook`]

mod connection;
mod leak;

pub use connection::{Connection, ConnectionState};
pub use leak::LeakHook;
