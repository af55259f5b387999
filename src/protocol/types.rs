//! Wire types
//!
//! Type codes and the decoded [`Value`] sum type, plus the three temporal
//! types (date, time-of-day, timestamp) which are not interchangeable.

use std::fmt;

use chrono::{DateTime, NaiveTime, TimeZone, Timelike, Utc};
use uuid::Uuid;

/// Milliseconds in one day; upper bound (exclusive) for a time-of-day value
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Nanoseconds in one millisecond; upper bound (exclusive) for a timestamp remainder
pub const NANOS_PER_MILLI: i32 = 1_000_000;

// =============================================================================
// Type Codes
// =============================================================================

/// One-byte wire type code preceding every object-tagged value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    Char = 7,
    Bool = 8,
    String = 9,
    Uuid = 10,
    Date = 11,
    ByteArray = 12,
    ShortArray = 13,
    IntArray = 14,
    LongArray = 15,
    FloatArray = 16,
    DoubleArray = 17,
    CharArray = 18,
    BoolArray = 19,
    StringArray = 20,
    UuidArray = 21,
    DateArray = 22,
    Timestamp = 33,
    TimestampArray = 34,
    Time = 36,
    TimeArray = 37,
    Null = 101,
}

impl TypeCode {
    /// Map a raw tag byte to a type code; `None` for tags this client does not know
    pub fn from_u8(tag: u8) -> Option<Self> {
        let code = match tag {
            1 => TypeCode::Byte,
            2 => TypeCode::Short,
            3 => TypeCode::Int,
            4 => TypeCode::Long,
            5 => TypeCode::Float,
            6 => TypeCode::Double,
            7 => TypeCode::Char,
            8 => TypeCode::Bool,
            9 => TypeCode::String,
            10 => TypeCode::Uuid,
            11 => TypeCode::Date,
            12 => TypeCode::ByteArray,
            13 => TypeCode::ShortArray,
            14 => TypeCode::IntArray,
            15 => TypeCode::LongArray,
            16 => TypeCode::FloatArray,
            17 => TypeCode::DoubleArray,
            18 => TypeCode::CharArray,
            19 => TypeCode::BoolArray,
            20 => TypeCode::StringArray,
            21 => TypeCode::UuidArray,
            22 => TypeCode::DateArray,
            33 => TypeCode::Timestamp,
            34 => TypeCode::TimestampArray,
            36 => TypeCode::Time,
            37 => TypeCode::TimeArray,
            101 => TypeCode::Null,
            _ => return None,
        };
        Some(code)
    }

    /// Raw tag byte
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// Char
// =============================================================================

/// A single UTF-16 code unit
///
/// Characters outside the basic multilingual plane cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Char(pub u16);

impl Char {
    /// Convert a `char` if it fits in one UTF-16 code unit
    pub fn from_char(c: char) -> Option<Self> {
        let mut units = [0u16; 2];
        match c.encode_utf16(&mut units) {
            [unit] => Some(Char(*unit)),
            _ => None,
        }
    }

    /// The code unit as a `char`; `None` for lone surrogates
    pub fn to_char(self) -> Option<char> {
        char::from_u32(self.0 as u32)
    }
}

impl fmt::Display for Char {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_char() {
            Some(c) => write!(f, "{}", c),
            None => write!(f, "\\u{{{:04x}}}", self.0),
        }
    }
}

// =============================================================================
// Temporal Types
// =============================================================================

/// Calendar date carried as milliseconds since the Unix epoch (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(i64);

impl Date {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Truncates anything finer than a millisecond
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// `None` if the value is outside chrono's representable range
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "date({}ms)", self.0),
        }
    }
}

/// Time of day carried as milliseconds since midnight
///
/// Has no date component. Always within `0..MILLIS_PER_DAY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(i64);

impl Time {
    /// `None` when `millis` is negative or a full day or more
    pub fn from_millis(millis: i64) -> Option<Self> {
        (0..MILLIS_PER_DAY).contains(&millis).then_some(Self(millis))
    }

    pub fn from_hms_milli(hour: u32, minute: u32, second: u32, milli: u32) -> Option<Self> {
        if hour >= 24 || minute >= 60 || second >= 60 || milli >= 1000 {
            return None;
        }
        let seconds = (hour as i64 * 60 + minute as i64) * 60 + second as i64;
        let millis = seconds * 1000 + milli as i64;
        Some(Self(millis))
    }

    /// Drops the date and anything finer than a millisecond
    pub fn from_naive_time(t: NaiveTime) -> Self {
        let millis = t.num_seconds_from_midnight() as i64 * 1000
            + (t.nanosecond() as i64 / NANOS_PER_MILLI as i64).min(999);
        Self(millis)
    }

    pub const fn millis(self) -> i64 {
        self.0
    }

    pub fn hour(self) -> u32 {
        (self.0 / 3_600_000) as u32
    }

    pub fn minute(self) -> u32 {
        (self.0 / 60_000 % 60) as u32
    }

    pub fn second(self) -> u32 {
        (self.0 / 1000 % 60) as u32
    }

    pub fn millisecond(self) -> u32 {
        (self.0 % 1000) as u32
    }

    pub fn to_naive_time(self) -> NaiveTime {
        let secs = (self.0 / 1000) as u32;
        let nanos = self.millisecond() * NANOS_PER_MILLI as u32;
        // in range by construction
        NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).unwrap_or_default()
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hour(),
            self.minute(),
            self.second(),
            self.millisecond()
        )
    }
}

/// Instant with nanosecond resolution
///
/// On the wire: epoch milliseconds followed by the nanosecond remainder within
/// that millisecond (`0..NANOS_PER_MILLI`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: i64,
    nanos: i32,
}

impl Timestamp {
    /// `None` if the remainder is outside `0..NANOS_PER_MILLI`
    pub fn new(millis: i64, nanos: i32) -> Option<Self> {
        (0..NANOS_PER_MILLI)
            .contains(&nanos)
            .then_some(Self { millis, nanos })
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            millis: dt.timestamp_millis(),
            nanos: (dt.timestamp_subsec_nanos() % NANOS_PER_MILLI as u32) as i32,
        }
    }

    pub const fn millis(self) -> i64 {
        self.millis
    }

    pub const fn nanos(self) -> i32 {
        self.nanos
    }

    /// Nanoseconds since the Unix epoch
    pub fn as_nanos(self) -> i128 {
        self.millis as i128 * NANOS_PER_MILLI as i128 + self.nanos as i128
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let secs = self.millis.div_euclid(1000);
        let sub_milli = self.millis.rem_euclid(1000) as u32;
        let nanos = sub_milli * NANOS_PER_MILLI as u32 + self.nanos as u32;
        Utc.timestamp_opt(secs, nanos).single()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.9fZ")),
            None => write!(f, "timestamp({}ms+{}ns)", self.millis, self.nanos),
        }
    }
}

// =============================================================================
// Value
// =============================================================================

/// Decoded form of any wire-typed datum
///
/// One variant per supported type code. Elements of object arrays are
/// individually nullable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(Char),
    Bool(bool),
    String(String),
    Uuid(Uuid),
    Date(Date),
    ByteArray(Vec<u8>),
    ShortArray(Vec<i16>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    CharArray(Vec<Char>),
    BoolArray(Vec<bool>),
    StringArray(Vec<Option<String>>),
    UuidArray(Vec<Option<Uuid>>),
    DateArray(Vec<Option<Date>>),
    Timestamp(Timestamp),
    TimestampArray(Vec<Option<Timestamp>>),
    Time(Time),
    TimeArray(Vec<Option<Time>>),
}

impl Value {
    /// Wire type code of this value
    pub fn type_code(&self) -> TypeCode {
        match self {
            Value::Null => TypeCode::Null,
            Value::Byte(_) => TypeCode::Byte,
            Value::Short(_) => TypeCode::Short,
            Value::Int(_) => TypeCode::Int,
            Value::Long(_) => TypeCode::Long,
            Value::Float(_) => TypeCode::Float,
            Value::Double(_) => TypeCode::Double,
            Value::Char(_) => TypeCode::Char,
            Value::Bool(_) => TypeCode::Bool,
            Value::String(_) => TypeCode::String,
            Value::Uuid(_) => TypeCode::Uuid,
            Value::Date(_) => TypeCode::Date,
            Value::ByteArray(_) => TypeCode::ByteArray,
            Value::ShortArray(_) => TypeCode::ShortArray,
            Value::IntArray(_) => TypeCode::IntArray,
            Value::LongArray(_) => TypeCode::LongArray,
            Value::FloatArray(_) => TypeCode::FloatArray,
            Value::DoubleArray(_) => TypeCode::DoubleArray,
            Value::CharArray(_) => TypeCode::CharArray,
            Value::BoolArray(_) => TypeCode::BoolArray,
            Value::StringArray(_) => TypeCode::StringArray,
            Value::UuidArray(_) => TypeCode::UuidArray,
            Value::DateArray(_) => TypeCode::DateArray,
            Value::Timestamp(_) => TypeCode::Timestamp,
            Value::TimestampArray(_) => TypeCode::TimestampArray,
            Value::Time(_) => TypeCode::Time,
            Value::TimeArray(_) => TypeCode::TimeArray,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant widened to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Value::Date(v)
    }
}

impl From<Time> for Value {
    fn from(v: Time) -> Self {
        Value::Time(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item(f, v)?;
    }
    write!(f, "]")
}

fn write_opt<T: fmt::Display>(f: &mut fmt::Formatter<'_>, v: &Option<T>) -> fmt::Result {
    match v {
        Some(v) => write!(f, "{}", v),
        None => write!(f, "null"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::ByteArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::ShortArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::IntArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::LongArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::FloatArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::DoubleArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::CharArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::BoolArray(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            Value::StringArray(v) => write_list(f, v, write_opt),
            Value::UuidArray(v) => write_list(f, v, write_opt),
            Value::DateArray(v) => write_list(f, v, write_opt),
            Value::TimestampArray(v) => write_list(f, v, write_opt),
            Value::TimeArray(v) => write_list(f, v, write_opt),
        }
    }
}
