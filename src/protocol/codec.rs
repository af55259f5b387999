//! Binary type codec
//!
//! Encoding and decoding of every wire value type over an in-memory cursor.
//! No I/O happens here; framing hands a complete payload to [`BinaryReader`]
//! and takes a finished [`BinaryWriter`] buffer.
//!
//! ## Encoding Rules
//! All multi-byte integers are little endian.
//!
//! ```text
//! byte  u8            short i16        char  u16 (one UTF-16 unit)
//! int   i32           long  i64        bool  u8 (0 or 1 only)
//! float f32           double f64
//!
//! object string   ┌─────────┬──────────┬───────────────┐
//!                 │ 9 (1)   │ Len (4)  │ UTF-8 bytes   │   or  │ 101 (1) │
//!                 └─────────┴──────────┴───────────────┘
//!
//! primitive array ┌──────────┬─────────────────────────┐
//!                 │Count (4) │ packed raw elements     │
//!                 └──────────┴─────────────────────────┘
//!
//! object array    ┌──────────┬──────────────┬──────────────┬─────┐
//!                 │Count (4) │ tag + body   │ tag + body   │ ... │
//!                 └──────────┴──────────────┴──────────────┴─────┘
//!
//! timestamp       ┌──────────────────┬────────────────────┐
//!                 │ epoch millis (8) │ nanos in milli (4) │
//!                 └──────────────────┴────────────────────┘
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{IgniteError, Result};
use super::types::{Char, Date, Time, Timestamp, TypeCode, Value};

// =============================================================================
// Reader
// =============================================================================

/// Cursor over a received payload with typed read operations
#[derive(Debug, Clone, Default)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Unconsumed bytes, without advancing
    pub fn as_slice(&self) -> &[u8] {
        self.buf.chunk()
    }

    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(IgniteError::Decode(format!(
                "{}: need {} bytes, {} remaining",
                what,
                needed,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Primitives
    // -------------------------------------------------------------------------

    pub fn read_byte(&mut self) -> Result<u8> {
        self.ensure(1, "byte")?;
        Ok(self.buf.get_u8())
    }

    pub fn read_short(&mut self) -> Result<i16> {
        self.ensure(2, "short")?;
        Ok(self.buf.get_i16_le())
    }

    pub fn read_int(&mut self) -> Result<i32> {
        self.ensure(4, "int")?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_long(&mut self) -> Result<i64> {
        self.ensure(8, "long")?;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_float(&mut self) -> Result<f32> {
        self.ensure(4, "float")?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_double(&mut self) -> Result<f64> {
        self.ensure(8, "double")?;
        Ok(self.buf.get_f64_le())
    }

    pub fn read_char(&mut self) -> Result<Char> {
        self.ensure(2, "char")?;
        Ok(Char(self.buf.get_u16_le()))
    }

    /// Only 0 and 1 are valid
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(IgniteError::Decode(format!(
                "invalid bool value: 0x{:02x}",
                other
            ))),
        }
    }

    // -------------------------------------------------------------------------
    // Untagged reference bodies
    // -------------------------------------------------------------------------

    /// 16 raw bytes, no half swapping
    pub fn read_uuid(&mut self) -> Result<Uuid> {
        self.ensure(16, "UUID")?;
        let mut raw = [0u8; 16];
        self.buf.copy_to_slice(&mut raw);
        Ok(Uuid::from_bytes(raw))
    }

    pub fn read_date(&mut self) -> Result<Date> {
        self.ensure(8, "date")?;
        Ok(Date::from_millis(self.buf.get_i64_le()))
    }

    pub fn read_time(&mut self) -> Result<Time> {
        self.ensure(8, "time")?;
        let millis = self.buf.get_i64_le();
        Time::from_millis(millis).ok_or_else(|| {
            IgniteError::Decode(format!("time of day out of range: {}ms", millis))
        })
    }

    pub fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.ensure(12, "timestamp")?;
        let millis = self.buf.get_i64_le();
        let nanos = self.buf.get_i32_le();
        Timestamp::new(millis, nanos).ok_or_else(|| {
            IgniteError::Decode(format!("timestamp nanosecond remainder out of range: {}", nanos))
        })
    }

    /// Length-prefixed UTF-8 body following a string tag
    fn read_string_body(&mut self) -> Result<String> {
        let len = self.read_len("string length")?;
        self.ensure(len, "string bytes")?;
        let raw = self.buf.copy_to_bytes(len);
        String::from_utf8(raw.to_vec())
            .map_err(|e| IgniteError::Decode(format!("string is not valid UTF-8: {}", e)))
    }

    /// Non-negative i32 length or count
    fn read_len(&mut self, what: &str) -> Result<usize> {
        let len = self.read_int()?;
        usize::try_from(len)
            .map_err(|_| IgniteError::Decode(format!("negative {}: {}", what, len)))
    }

    /// Count for an array whose elements take at least `min_element_size` bytes
    pub(crate) fn read_count(&mut self, min_element_size: usize, what: &str) -> Result<usize> {
        let count = self.read_len(what)?;
        let needed = count.saturating_mul(min_element_size);
        if needed > self.buf.remaining() {
            return Err(IgniteError::Decode(format!(
                "{} of {} exceeds remaining payload of {} bytes",
                what,
                count,
                self.buf.remaining()
            )));
        }
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Tagged objects
    // -------------------------------------------------------------------------

    /// Read a type tag, rejecting codes this client does not know
    pub fn read_type_code(&mut self) -> Result<TypeCode> {
        let tag = self.read_byte()?;
        TypeCode::from_u8(tag)
            .ok_or_else(|| IgniteError::Decode(format!("unknown type code: {}", tag)))
    }

    /// Object string; the null tag yields an empty string
    pub fn read_ostring(&mut self) -> Result<String> {
        Ok(self.read_string_opt()?.unwrap_or_default())
    }

    /// Object string keeping null distinct from empty
    pub fn read_string_opt(&mut self) -> Result<Option<String>> {
        let tag = self.read_byte()?;
        match TypeCode::from_u8(tag) {
            Some(TypeCode::String) => self.read_string_body().map(Some),
            Some(TypeCode::Null) => Ok(None),
            _ => Err(IgniteError::Decode(format!(
                "expected string or null type code, got {}",
                tag
            ))),
        }
    }

    /// Read one tagged value of any supported type
    pub fn read_object(&mut self) -> Result<Value> {
        let code = self.read_type_code()?;
        self.read_value_body(code)
    }

    /// Decode the body that follows `code`
    pub fn read_value_body(&mut self, code: TypeCode) -> Result<Value> {
        let value = match code {
            TypeCode::Null => Value::Null,
            TypeCode::Byte => Value::Byte(self.read_byte()?),
            TypeCode::Short => Value::Short(self.read_short()?),
            TypeCode::Int => Value::Int(self.read_int()?),
            TypeCode::Long => Value::Long(self.read_long()?),
            TypeCode::Float => Value::Float(self.read_float()?),
            TypeCode::Double => Value::Double(self.read_double()?),
            TypeCode::Char => Value::Char(self.read_char()?),
            TypeCode::Bool => Value::Bool(self.read_bool()?),
            TypeCode::String => Value::String(self.read_string_body()?),
            TypeCode::Uuid => Value::Uuid(self.read_uuid()?),
            TypeCode::Date => Value::Date(self.read_date()?),
            TypeCode::Timestamp => Value::Timestamp(self.read_timestamp()?),
            TypeCode::Time => Value::Time(self.read_time()?),
            TypeCode::ByteArray => Value::ByteArray(self.read_array_bytes()?),
            TypeCode::ShortArray => Value::ShortArray(self.read_array_shorts()?),
            TypeCode::IntArray => Value::IntArray(self.read_array_ints()?),
            TypeCode::LongArray => Value::LongArray(self.read_array_longs()?),
            TypeCode::FloatArray => Value::FloatArray(self.read_array_floats()?),
            TypeCode::DoubleArray => Value::DoubleArray(self.read_array_doubles()?),
            TypeCode::CharArray => Value::CharArray(self.read_array_chars()?),
            TypeCode::BoolArray => Value::BoolArray(self.read_array_bools()?),
            TypeCode::StringArray => Value::StringArray(self.read_array_ostrings()?),
            TypeCode::UuidArray => Value::UuidArray(self.read_array_ouuids()?),
            TypeCode::DateArray => Value::DateArray(self.read_array_odates()?),
            TypeCode::TimestampArray => Value::TimestampArray(self.read_array_otimestamps()?),
            TypeCode::TimeArray => Value::TimeArray(self.read_array_otimes()?),
        };
        Ok(value)
    }

    // -------------------------------------------------------------------------
    // Primitive arrays (packed, no element tags)
    // -------------------------------------------------------------------------

    fn read_packed<T>(
        &mut self,
        element_size: usize,
        what: &str,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count = self.read_count(element_size, what)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(read(self)?);
        }
        Ok(out)
    }

    pub fn read_array_bytes(&mut self) -> Result<Vec<u8>> {
        let count = self.read_count(1, "byte array length")?;
        Ok(self.buf.copy_to_bytes(count).to_vec())
    }

    pub fn read_array_shorts(&mut self) -> Result<Vec<i16>> {
        self.read_packed(2, "short array length", Self::read_short)
    }

    pub fn read_array_ints(&mut self) -> Result<Vec<i32>> {
        self.read_packed(4, "int array length", Self::read_int)
    }

    pub fn read_array_longs(&mut self) -> Result<Vec<i64>> {
        self.read_packed(8, "long array length", Self::read_long)
    }

    pub fn read_array_floats(&mut self) -> Result<Vec<f32>> {
        self.read_packed(4, "float array length", Self::read_float)
    }

    pub fn read_array_doubles(&mut self) -> Result<Vec<f64>> {
        self.read_packed(8, "double array length", Self::read_double)
    }

    pub fn read_array_chars(&mut self) -> Result<Vec<Char>> {
        self.read_packed(2, "char array length", Self::read_char)
    }

    pub fn read_array_bools(&mut self) -> Result<Vec<bool>> {
        self.read_packed(1, "bool array length", Self::read_bool)
    }

    // -------------------------------------------------------------------------
    // Object arrays (every element tagged, body decoded through read_value_body)
    // -------------------------------------------------------------------------

    /// Elements must carry the null tag or `expected`. The tag is checked
    /// before the body is read, so a nested array is rejected without
    /// recursing into it.
    fn read_tagged<T>(
        &mut self,
        expected: TypeCode,
        mut extract: impl FnMut(Value) -> Option<T>,
    ) -> Result<Vec<Option<T>>> {
        let count = self.read_count(1, "object array length")?;
        let mut out = Vec::with_capacity(count);
        for index in 0..count {
            let mismatch = |found: TypeCode| {
                IgniteError::Decode(format!(
                    "array element {}: expected {:?}, got {:?}",
                    index, expected, found
                ))
            };
            let code = self.read_type_code()?;
            if code == TypeCode::Null {
                out.push(None);
                continue;
            }
            if code != expected {
                return Err(mismatch(code));
            }
            let value = self.read_value_body(code)?;
            out.push(Some(extract(value).ok_or_else(|| mismatch(code))?));
        }
        Ok(out)
    }

    pub fn read_array_ostrings(&mut self) -> Result<Vec<Option<String>>> {
        self.read_tagged(TypeCode::String, |v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn read_array_ouuids(&mut self) -> Result<Vec<Option<Uuid>>> {
        self.read_tagged(TypeCode::Uuid, |v| match v {
            Value::Uuid(u) => Some(u),
            _ => None,
        })
    }

    pub fn read_array_odates(&mut self) -> Result<Vec<Option<Date>>> {
        self.read_tagged(TypeCode::Date, |v| match v {
            Value::Date(d) => Some(d),
            _ => None,
        })
    }

    pub fn read_array_otimestamps(&mut self) -> Result<Vec<Option<Timestamp>>> {
        self.read_tagged(TypeCode::Timestamp, |v| match v {
            Value::Timestamp(t) => Some(t),
            _ => None,
        })
    }

    pub fn read_array_otimes(&mut self) -> Result<Vec<Option<Time>>> {
        self.read_tagged(TypeCode::Time, |v| match v {
            Value::Time(t) => Some(t),
            _ => None,
        })
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Growable buffer with typed write operations mirroring [`BinaryReader`]
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

/// Convert a length to the wire's i32, failing for oversized values
fn wire_len(len: usize, what: &str) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| IgniteError::Encode(format!("{} too large for the wire: {}", what, len)))
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Append bytes verbatim
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    // -------------------------------------------------------------------------
    // Primitives
    // -------------------------------------------------------------------------

    pub fn write_byte(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn write_short(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    pub fn write_int(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn write_long(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    pub fn write_float(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn write_double(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    pub fn write_char(&mut self, v: Char) {
        self.buf.put_u16_le(v.0);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    // -------------------------------------------------------------------------
    // Untagged reference bodies
    // -------------------------------------------------------------------------

    pub fn write_uuid(&mut self, v: &Uuid) {
        self.buf.put_slice(v.as_bytes());
    }

    pub fn write_date(&mut self, v: Date) {
        self.buf.put_i64_le(v.millis());
    }

    pub fn write_time(&mut self, v: Time) {
        self.buf.put_i64_le(v.millis());
    }

    pub fn write_timestamp(&mut self, v: Timestamp) {
        self.buf.put_i64_le(v.millis());
        self.buf.put_i32_le(v.nanos());
    }

    fn write_string_body(&mut self, v: &str) -> Result<()> {
        self.buf.put_i32_le(wire_len(v.len(), "string")?);
        self.buf.put_slice(v.as_bytes());
        Ok(())
    }

    pub(crate) fn write_count(&mut self, count: usize) -> Result<()> {
        self.buf.put_i32_le(wire_len(count, "array")?);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tagged objects
    // -------------------------------------------------------------------------

    pub fn write_type_code(&mut self, code: TypeCode) {
        self.buf.put_u8(code.as_u8());
    }

    pub fn write_null(&mut self) {
        self.write_type_code(TypeCode::Null);
    }

    /// Tagged string
    pub fn write_ostring(&mut self, v: &str) -> Result<()> {
        self.write_type_code(TypeCode::String);
        self.write_string_body(v)
    }

    /// Tagged string, or the null tag for `None`
    pub fn write_string_opt(&mut self, v: Option<&str>) -> Result<()> {
        match v {
            Some(s) => self.write_ostring(s),
            None => {
                self.write_null();
                Ok(())
            }
        }
    }

    /// Write `value` with its leading type code
    pub fn write_object(&mut self, value: &Value) -> Result<()> {
        self.write_type_code(value.type_code());
        match value {
            Value::Null => {}
            Value::Byte(v) => self.write_byte(*v),
            Value::Short(v) => self.write_short(*v),
            Value::Int(v) => self.write_int(*v),
            Value::Long(v) => self.write_long(*v),
            Value::Float(v) => self.write_float(*v),
            Value::Double(v) => self.write_double(*v),
            Value::Char(v) => self.write_char(*v),
            Value::Bool(v) => self.write_bool(*v),
            Value::String(v) => self.write_string_body(v)?,
            Value::Uuid(v) => self.write_uuid(v),
            Value::Date(v) => self.write_date(*v),
            Value::Timestamp(v) => self.write_timestamp(*v),
            Value::Time(v) => self.write_time(*v),
            Value::ByteArray(v) => {
                self.write_count(v.len())?;
                self.buf.put_slice(v);
            }
            Value::ShortArray(v) => self.write_packed(v, |w, x| w.write_short(*x))?,
            Value::IntArray(v) => self.write_packed(v, |w, x| w.write_int(*x))?,
            Value::LongArray(v) => self.write_packed(v, |w, x| w.write_long(*x))?,
            Value::FloatArray(v) => self.write_packed(v, |w, x| w.write_float(*x))?,
            Value::DoubleArray(v) => self.write_packed(v, |w, x| w.write_double(*x))?,
            Value::CharArray(v) => self.write_packed(v, |w, x| w.write_char(*x))?,
            Value::BoolArray(v) => self.write_packed(v, |w, x| w.write_bool(*x))?,
            Value::StringArray(v) => {
                self.write_tagged(v, |s| Value::String(s.clone()))?
            }
            Value::UuidArray(v) => self.write_tagged(v, |u| Value::Uuid(*u))?,
            Value::DateArray(v) => self.write_tagged(v, |d| Value::Date(*d))?,
            Value::TimestampArray(v) => self.write_tagged(v, |t| Value::Timestamp(*t))?,
            Value::TimeArray(v) => self.write_tagged(v, |t| Value::Time(*t))?,
        }
        Ok(())
    }

    fn write_packed<T>(&mut self, items: &[T], mut write: impl FnMut(&mut Self, &T)) -> Result<()> {
        self.write_count(items.len())?;
        for item in items {
            write(self, item);
        }
        Ok(())
    }

    fn write_tagged<T>(
        &mut self,
        items: &[Option<T>],
        mut wrap: impl FnMut(&T) -> Value,
    ) -> Result<()> {
        self.write_count(items.len())?;
        for item in items {
            match item {
                Some(v) => self.write_object(&wrap(v))?,
                None => self.write_null(),
            }
        }
        Ok(())
    }
}
