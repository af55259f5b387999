//! Client Module
//!
//! Cache operations on top of a single [`Connection`].
//!
//! ## Responsibilities
//! - Allocate request ids
//! - Build operation bodies and decode their responses
//! - Map cache names to cache ids

use std::sync::atomic::{AtomicI64, Ordering};

use crate::cache::{cache_id, CacheConfiguration, CacheConfigurationRefs};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::network::Connection;
use crate::protocol::{BinaryWriter, OpCode, OperationRequest, OperationResponse, Value};

/// Thin client for one cluster node
///
/// Shareable between threads; each operation is one exchange on the
/// underlying connection.
#[derive(Debug)]
pub struct Client {
    connection: Connection,

    /// Next request id to hand out
    next_request_id: AtomicI64,
}

impl Client {
    /// Connect and handshake using `config`
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let connection = Connection::connect(&config)?;
        Ok(Self::from_connection(connection))
    }

    /// Wrap an already connected [`Connection`]
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection,
            next_request_id: AtomicI64::new(1),
        }
    }

    pub fn connected(&self) -> bool {
        self.connection.connected()
    }

    pub fn close(&self) -> Result<()> {
        self.connection.close()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Send one operation and return its successful response
    ///
    /// `build` writes the request body. A non-zero status comes back as
    /// [`crate::IgniteError::Server`].
    pub fn execute(
        &self,
        opcode: OpCode,
        build: impl FnOnce(&mut BinaryWriter) -> Result<()>,
    ) -> Result<OperationResponse> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);

        let mut request = OperationRequest::new(opcode, request_id);
        build(request.body_mut())?;

        let mut response = OperationResponse::new(request_id);
        self.connection.exchange(&request, &mut response)?;

        tracing::trace!("{} (request {}) succeeded", opcode.name(), request_id);
        Ok(response)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Create a cache with default configuration; fails if it exists
    pub fn cache_create_with_name(&self, name: &str) -> Result<()> {
        self.execute(OpCode::CacheCreateWithName, |w| w.write_ostring(name))?;
        Ok(())
    }

    pub fn cache_get_or_create_with_name(&self, name: &str) -> Result<()> {
        self.execute(OpCode::CacheGetOrCreateWithName, |w| w.write_ostring(name))?;
        Ok(())
    }

    /// Names of all caches on the cluster
    pub fn cache_get_names(&self) -> Result<Vec<String>> {
        let mut response = self.execute(OpCode::CacheGetNames, |_| Ok(()))?;
        let body = response.body();

        let count = body.read_count(1, "cache name count")?;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(body.read_ostring()?);
        }
        Ok(names)
    }

    pub fn cache_destroy(&self, name: &str) -> Result<()> {
        self.execute(OpCode::CacheDestroy, |w| {
            w.write_int(cache_id(name));
            Ok(())
        })?;
        Ok(())
    }

    /// Configuration of an existing cache
    pub fn cache_get_configuration(&self, name: &str, flag: u8) -> Result<CacheConfiguration> {
        let mut response = self.execute(OpCode::CacheGetConfiguration, |w| {
            w.write_int(cache_id(name));
            w.write_byte(flag);
            Ok(())
        })?;
        CacheConfiguration::read_from(response.body())
    }

    pub fn cache_create_with_configuration(&self, refs: &CacheConfigurationRefs) -> Result<()> {
        self.execute(OpCode::CacheCreateWithConfiguration, |w| refs.write_to(w))?;
        Ok(())
    }

    pub fn cache_get_or_create_with_configuration(
        &self,
        refs: &CacheConfigurationRefs,
    ) -> Result<()> {
        self.execute(OpCode::CacheGetOrCreateWithConfiguration, |w| refs.write_to(w))?;
        Ok(())
    }

    // =========================================================================
    // Key-Value Operations
    // =========================================================================

    /// Value stored under `key`, or [`Value::Null`]
    ///
    /// `binary` asks the server to keep binary objects in binary form.
    pub fn cache_get(&self, name: &str, binary: bool, key: &Value) -> Result<Value> {
        let mut response = self.execute(OpCode::CacheGet, |w| {
            write_cache_header(w, name, binary);
            w.write_object(key)
        })?;
        response.body().read_object()
    }

    pub fn cache_put(&self, name: &str, binary: bool, key: &Value, value: &Value) -> Result<()> {
        self.execute(OpCode::CachePut, |w| {
            write_cache_header(w, name, binary);
            w.write_object(key)?;
            w.write_object(value)
        })?;
        Ok(())
    }

    /// Pairs for the keys that exist; missing keys are omitted by the server
    pub fn cache_get_all(
        &self,
        name: &str,
        binary: bool,
        keys: &[Value],
    ) -> Result<Vec<(Value, Value)>> {
        let mut response = self.execute(OpCode::CacheGetAll, |w| {
            write_cache_header(w, name, binary);
            w.write_count(keys.len())?;
            for key in keys {
                w.write_object(key)?;
            }
            Ok(())
        })?;

        let body = response.body();
        let count = body.read_count(2, "entry count")?;
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let key = body.read_object()?;
            let value = body.read_object()?;
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    pub fn cache_put_all(&self, name: &str, binary: bool, pairs: &[(Value, Value)]) -> Result<()> {
        self.execute(OpCode::CachePutAll, |w| {
            write_cache_header(w, name, binary);
            w.write_count(pairs.len())?;
            for (key, value) in pairs {
                w.write_object(key)?;
                w.write_object(value)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

/// Cache id followed by the keep-binary flag
fn write_cache_header(w: &mut BinaryWriter, name: &str, binary: bool) {
    w.write_int(cache_id(name));
    w.write_byte(u8::from(binary));
}
