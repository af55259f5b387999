//! Handshake messages
//!
//! Sent once, right after the TCP connection opens.
//!
//! ### Request payload
//! ```text
//! ┌────────┬───────────┬───────────┬───────────┬────────────┐
//! │ Op (1) │ Major (2) │ Minor (2) │ Patch (2) │ Client (1) │
//! └────────┴───────────┴───────────┴───────────┴────────────┘
//! ```
//!
//! ### Response payload
//! ```text
//! ┌─────────────┬─ on failure only ───────────────────────────────┐
//! │ Success (1) │ Major (2) │ Minor (2) │ Patch (2) │ Message (obj) │
//! └─────────────┴─────────────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::error::{IgniteError, Result};
use super::codec::{BinaryReader, BinaryWriter};
use super::message::{Request, Response};

/// Handshake operation code
pub const HANDSHAKE_OPCODE: u8 = 1;

/// Client type code for thin clients
pub const THIN_CLIENT_CODE: u8 = 2;

/// Protocol version triplet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: i16,
    pub minor: i16,
    pub patch: i16,
}

impl ProtocolVersion {
    pub const V1_0_0: ProtocolVersion = ProtocolVersion::new(1, 0, 0);

    pub const fn new(major: i16, minor: i16, patch: i16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::V1_0_0
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Handshake request carrying the requested protocol version
#[derive(Debug, Clone, Copy)]
pub struct HandshakeRequest {
    pub version: ProtocolVersion,
}

impl HandshakeRequest {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }
}

impl Request for HandshakeRequest {
    fn name(&self) -> &'static str {
        "handshake"
    }

    fn write_payload(&self, out: &mut BinaryWriter) -> Result<()> {
        out.write_byte(HANDSHAKE_OPCODE);
        out.write_short(self.version.major);
        out.write_short(self.version.minor);
        out.write_short(self.version.patch);
        out.write_byte(THIN_CLIENT_CODE);
        Ok(())
    }
}

/// Handshake outcome as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub success: bool,

    /// Server supported version; only present on failure
    pub server_version: Option<ProtocolVersion>,

    /// Diagnostic message; empty on success
    pub message: String,
}

impl HandshakeResponse {
    /// Turn a failed handshake into [`IgniteError::Handshake`]
    pub fn into_result(self) -> Result<()> {
        if self.success {
            return Ok(());
        }
        let version = self.server_version.unwrap_or_default();
        Err(IgniteError::Handshake {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
            message: self.message,
        })
    }
}

impl Response for HandshakeResponse {
    fn read_payload(&mut self, mut payload: BinaryReader) -> Result<()> {
        self.success = payload.read_bool()?;
        if self.success {
            self.server_version = None;
            self.message.clear();
            return Ok(());
        }

        let major = payload.read_short()?;
        let minor = payload.read_short()?;
        let patch = payload.read_short()?;
        self.server_version = Some(ProtocolVersion::new(major, minor, patch));
        self.message = payload.read_ostring()?;
        Ok(())
    }
}
