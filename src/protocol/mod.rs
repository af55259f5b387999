//! Protocol Module
//!
//! Defines the binary thin-client wire protocol.
//!
//! ## Protocol Format (v1.x)
//!
//! ### Frame
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │         Payload             │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payloads
//! - Handshake: see [`handshake`]
//! - Operations: opcode (2) + request id (8) + body, answered by
//!   request id (8) + status (4) + body
//!
//! ### Values
//! Bodies are made of values in the type-tagged encoding described in
//! [`codec`]: a one-byte [`TypeCode`] followed by the type's body.

pub mod codec;
pub mod frame;
pub mod handshake;
mod message;
mod operation;
mod types;

pub use codec::{BinaryReader, BinaryWriter};
pub use frame::{
    decode_length, encode_frame, read_frame, write_frame, DEFAULT_MAX_FRAME_SIZE,
    LENGTH_PREFIX_SIZE,
};
pub use handshake::{HandshakeRequest, HandshakeResponse, ProtocolVersion};
pub use message::{RawResponse, Request, Response};
pub use operation::{OpCode, OperationRequest, OperationResponse};
pub use types::{Char, Date, Time, Timestamp, TypeCode, Value, MILLIS_PER_DAY, NANOS_PER_MILLI};
