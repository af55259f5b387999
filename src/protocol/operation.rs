//! Standard operations
//!
//! Every operation after the handshake uses the same envelope.
//!
//! ### Request payload
//! ```text
//! ┌──────────┬──────────────┬──────────────┐
//! │ Op (2)   │ Req ID (8)   │    Body      │
//! └──────────┴──────────────┴──────────────┘
//! ```
//!
//! ### Response payload
//! ```text
//! ┌──────────────┬────────────┬──────────────────────────────────┐
//! │ Req ID (8)   │ Status (4) │ Body, or error message (obj str) │
//! └──────────────┴────────────┴──────────────────────────────────┘
//! ```

use crate::error::{IgniteError, Result};
use super::codec::{BinaryReader, BinaryWriter};
use super::message::{Request, Response};

/// Operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum OpCode {
    CacheGet = 1000,
    CachePut = 1001,
    CacheGetAll = 1003,
    CachePutAll = 1004,
    CacheGetNames = 1050,
    CacheCreateWithName = 1051,
    CacheGetOrCreateWithName = 1052,
    CacheCreateWithConfiguration = 1053,
    CacheGetOrCreateWithConfiguration = 1054,
    CacheGetConfiguration = 1055,
    CacheDestroy = 1056,
}

impl OpCode {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::CacheGet => "cache_get",
            OpCode::CachePut => "cache_put",
            OpCode::CacheGetAll => "cache_get_all",
            OpCode::CachePutAll => "cache_put_all",
            OpCode::CacheGetNames => "cache_get_names",
            OpCode::CacheCreateWithName => "cache_create_with_name",
            OpCode::CacheGetOrCreateWithName => "cache_get_or_create_with_name",
            OpCode::CacheCreateWithConfiguration => "cache_create_with_configuration",
            OpCode::CacheGetOrCreateWithConfiguration => "cache_get_or_create_with_configuration",
            OpCode::CacheGetConfiguration => "cache_get_configuration",
            OpCode::CacheDestroy => "cache_destroy",
        }
    }
}

/// Request with the standard header and a body built by the caller
#[derive(Debug)]
pub struct OperationRequest {
    opcode: OpCode,
    request_id: i64,
    body: BinaryWriter,
}

impl OperationRequest {
    pub fn new(opcode: OpCode, request_id: i64) -> Self {
        Self {
            opcode,
            request_id,
            body: BinaryWriter::new(),
        }
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    pub fn request_id(&self) -> i64 {
        self.request_id
    }

    pub fn body_mut(&mut self) -> &mut BinaryWriter {
        &mut self.body
    }
}

impl Request for OperationRequest {
    fn name(&self) -> &'static str {
        self.opcode.name()
    }

    fn write_payload(&self, out: &mut BinaryWriter) -> Result<()> {
        out.write_short(self.opcode.as_i16());
        out.write_long(self.request_id);
        out.write_raw(self.body.as_slice());
        Ok(())
    }
}

/// Response with the standard header
///
/// A non-zero status is returned from [`Response::read_payload`] as
/// [`IgniteError::Server`]; the frame is fully consumed either way.
#[derive(Debug)]
pub struct OperationResponse {
    expected_request_id: i64,
    status: i32,
    message: Option<String>,
    body: BinaryReader,
}

impl OperationResponse {
    /// Status code for success
    pub const STATUS_SUCCESS: i32 = 0;

    pub fn new(expected_request_id: i64) -> Self {
        Self {
            expected_request_id,
            status: Self::STATUS_SUCCESS,
            message: None,
            body: BinaryReader::default(),
        }
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == Self::STATUS_SUCCESS
    }

    /// Server error message, if the status was non-zero
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn body(&mut self) -> &mut BinaryReader {
        &mut self.body
    }
}

impl Response for OperationResponse {
    fn read_payload(&mut self, mut payload: BinaryReader) -> Result<()> {
        let request_id = payload.read_long()?;
        if request_id != self.expected_request_id {
            return Err(IgniteError::Decode(format!(
                "response request id {} does not match request id {}",
                request_id, self.expected_request_id
            )));
        }

        self.status = payload.read_int()?;
        if self.status != Self::STATUS_SUCCESS {
            let message = payload.read_ostring()?;
            self.message = Some(message.clone());
            return Err(IgniteError::Server {
                status: self.status,
                message,
            });
        }

        self.message = None;
        self.body = payload;
        Ok(())
    }
}
