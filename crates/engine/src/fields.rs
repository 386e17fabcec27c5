//! Serialization buffer for record values
//!
//! A stored record is split in two:
//! - the key: composite key bytes built from the key schema
//! - the value: a schema version header followed by tagged fields
//!
//! ## Value layout
//!
//! ```text
//! +----------------+-----+---------+-----+---------+-----
//! | version (u32)  | tag | payload | tag | payload | ...
//! +----------------+-----+---------+-----+---------+-----
//! ```
//!
//! Tags `0x01..=0x06` are the primitive kinds (see `ValueKind::tag`), plus
//! `0x00` null, `0x10` bool and `0x11` f64. Text and bytes carry a u32
//! big-endian length prefix. Timestamps keep full nanosecond precision here;
//! only key encoding truncates them.
//!
//! Fields are read back strictly in write order. A version header or tag
//! that does not match what the reader asks for is a schema mismatch, so a
//! record is either decoded completely or not at all.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use tuplestore_core::{DecodingError, EncodingError, Primitive, Value, ValueKind};

use crate::record::{KeyValues, Record, RecordDescriptor};

/// Bytes taken by the schema version header
pub const VERSION_HEADER_LEN: usize = 4;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x10;
const TAG_F64: u8 = 0x11;

/// Type tag of one stored field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Absent optional value
    Null,
    /// Boolean
    Bool,
    /// 64-bit float
    F64,
    /// One of the primitive key kinds
    Value(ValueKind),
}

impl FieldKind {
    /// Persisted tag byte
    pub fn tag(self) -> u8 {
        match self {
            FieldKind::Null => TAG_NULL,
            FieldKind::Bool => TAG_BOOL,
            FieldKind::F64 => TAG_F64,
            FieldKind::Value(kind) => kind.tag(),
        }
    }

    /// Parse a persisted tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_NULL => Some(FieldKind::Null),
            TAG_BOOL => Some(FieldKind::Bool),
            TAG_F64 => Some(FieldKind::F64),
            other => ValueKind::from_tag(other).map(FieldKind::Value),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Null => f.write_str("null"),
            FieldKind::Bool => f.write_str("bool"),
            FieldKind::F64 => f.write_str("f64"),
            FieldKind::Value(kind) => write!(f, "{}", kind),
        }
    }
}

/// Appends tagged fields after a schema version header
#[derive(Debug, Clone)]
pub struct FieldWriter {
    buf: Vec<u8>,
    count: usize,
    oversized: Option<usize>,
}

impl FieldWriter {
    /// Start a value buffer stamped with `schema_version`
    pub fn new(schema_version: u32) -> Self {
        let mut buf = vec![0u8; VERSION_HEADER_LEN];
        BigEndian::write_u32(&mut buf, schema_version);
        Self {
            buf,
            count: 0,
            oversized: None,
        }
    }

    /// Write any [`Field`]
    pub fn put<F: Field>(&mut self, field: &F) -> &mut Self {
        field.write_field(self);
        self
    }

    /// Write a primitive value
    pub fn put_value(&mut self, value: &Value) -> &mut Self {
        self.begin(FieldKind::Value(value.kind()));
        match value {
            Value::Text(s) => self.push_len_prefixed(s.as_bytes()),
            Value::Bytes(b) => self.push_len_prefixed(b),
            Value::Uint(n) => self.push_u64(*n),
            Value::Int(n) => self.push_u64(*n as u64),
            Value::Uuid(id) => self.buf.extend_from_slice(id.as_bytes()),
            Value::Timestamp(ts) => {
                self.push_u64(ts.timestamp() as u64);
                let mut nanos = [0u8; 4];
                BigEndian::write_u32(&mut nanos, ts.timestamp_subsec_nanos());
                self.buf.extend_from_slice(&nanos);
            }
        }
        self
    }

    /// Write a boolean
    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.begin(FieldKind::Bool);
        self.buf.push(u8::from(value));
        self
    }

    /// Write a float
    pub fn put_f64(&mut self, value: f64) -> &mut Self {
        self.begin(FieldKind::F64);
        self.push_u64(value.to_bits());
        self
    }

    /// Write an absent optional value
    pub fn put_null(&mut self) -> &mut Self {
        self.begin(FieldKind::Null);
        self
    }

    /// Number of fields written so far
    pub fn field_count(&self) -> usize {
        self.count
    }

    /// Finish and return the value bytes
    ///
    /// Fails with `FieldTooLarge` if any text or bytes field did not fit its
    /// length prefix.
    pub fn finish(self) -> Result<Vec<u8>, EncodingError> {
        match self.oversized {
            Some(len) => Err(EncodingError::FieldTooLarge { len }),
            None => Ok(self.buf),
        }
    }

    fn begin(&mut self, kind: FieldKind) {
        self.buf.push(kind.tag());
        self.count += 1;
    }

    fn push_u64(&mut self, n: u64) {
        let mut raw = [0u8; 8];
        BigEndian::write_u64(&mut raw, n);
        self.buf.extend_from_slice(&raw);
    }

    fn push_len_prefixed(&mut self, data: &[u8]) {
        match length_prefix(data.len()) {
            Ok(n) => {
                let mut len = [0u8; 4];
                BigEndian::write_u32(&mut len, n);
                self.buf.extend_from_slice(&len);
                self.buf.extend_from_slice(data);
            }
            Err(_) => {
                self.oversized.get_or_insert(data.len());
            }
        }
    }
}

fn length_prefix(len: usize) -> Result<u32, EncodingError> {
    u32::try_from(len).map_err(|_| EncodingError::FieldTooLarge { len })
}

/// Reads tagged fields back in write order
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    input: &'a [u8],
    cursor: usize,
    schema_version: u32,
    index: usize,
}

impl<'a> FieldReader<'a> {
    /// Open a value buffer, checking its version header
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if the header is missing or the stored version is
    /// not `expected_version`.
    pub fn new(input: &'a [u8], expected_version: u32) -> Result<Self, DecodingError> {
        if input.len() < VERSION_HEADER_LEN {
            return Err(DecodingError::schema_mismatch(format!(
                "value has {} byte(s), shorter than the schema version header",
                input.len()
            )));
        }
        let stored = BigEndian::read_u32(&input[..VERSION_HEADER_LEN]);
        if stored != expected_version {
            return Err(DecodingError::schema_mismatch(format!(
                "stored schema version {}, expected {}",
                stored, expected_version
            )));
        }
        Ok(Self {
            input,
            cursor: VERSION_HEADER_LEN,
            schema_version: stored,
            index: 0,
        })
    }

    /// Schema version found in the header
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Read any [`Field`]
    pub fn take<F: Field>(&mut self) -> Result<F, DecodingError> {
        F::read_field(self)
    }

    /// Kind of the next field, `None` when all fields are consumed
    pub fn peek_kind(&self) -> Result<Option<FieldKind>, DecodingError> {
        let Some(&tag) = self.input.get(self.cursor) else {
            return Ok(None);
        };
        FieldKind::from_tag(tag).map(Some).ok_or_else(|| {
            DecodingError::schema_mismatch(format!(
                "field {} has unknown tag 0x{:02x}",
                self.index, tag
            ))
        })
    }

    /// Read a primitive value of `kind`
    pub fn take_value(&mut self, kind: ValueKind) -> Result<Value, DecodingError> {
        self.expect_kind(FieldKind::Value(kind))?;
        match kind {
            ValueKind::Text => {
                let raw = self.take_len_prefixed()?;
                String::from_utf8(raw.to_vec())
                    .map(Value::Text)
                    .map_err(|e| DecodingError::malformed(kind, e.to_string()))
            }
            ValueKind::Bytes => Ok(Value::Bytes(self.take_len_prefixed()?.to_vec())),
            ValueKind::Uint => Ok(Value::Uint(self.take_u64()?)),
            ValueKind::Int => Ok(Value::Int(self.take_u64()? as i64)),
            ValueKind::Uuid => {
                let raw = self.take_bytes(16)?;
                Uuid::from_slice(raw)
                    .map(Value::Uuid)
                    .map_err(|e| DecodingError::malformed(kind, e.to_string()))
            }
            ValueKind::Timestamp => {
                let secs = self.take_u64()? as i64;
                let nanos = BigEndian::read_u32(self.take_bytes(4)?);
                timestamp_from_parts(secs, nanos)
                    .map(Value::Timestamp)
                    .ok_or_else(|| {
                        DecodingError::malformed(
                            kind,
                            format!("{}s + {}ns is out of range", secs, nanos),
                        )
                    })
            }
        }
    }

    /// Read a boolean
    pub fn take_bool(&mut self) -> Result<bool, DecodingError> {
        self.expect_kind(FieldKind::Bool)?;
        match self.take_bytes(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodingError::schema_mismatch(format!(
                "field {} holds invalid bool byte 0x{:02x}",
                self.index - 1,
                other
            ))),
        }
    }

    /// Read a float
    pub fn take_f64(&mut self) -> Result<f64, DecodingError> {
        self.expect_kind(FieldKind::F64)?;
        Ok(f64::from_bits(self.take_u64()?))
    }

    /// Consume a null field if one is next
    pub fn take_null(&mut self) -> Result<bool, DecodingError> {
        if self.peek_kind()? == Some(FieldKind::Null) {
            self.expect_kind(FieldKind::Null)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// True when every field has been read
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.input.len()
    }

    /// Check that no unread fields remain
    pub fn finish(&self) -> Result<(), DecodingError> {
        if !self.is_exhausted() {
            return Err(DecodingError::schema_mismatch(format!(
                "{} unread byte(s) after {} field(s)",
                self.input.len() - self.cursor,
                self.index
            )));
        }
        Ok(())
    }

    fn expect_kind(&mut self, wanted: FieldKind) -> Result<(), DecodingError> {
        match self.peek_kind()? {
            Some(found) if found == wanted => {
                self.cursor += 1;
                self.index += 1;
                Ok(())
            }
            Some(found) => Err(DecodingError::schema_mismatch(format!(
                "field {} is {}, expected {}",
                self.index, found, wanted
            ))),
            None => Err(DecodingError::schema_mismatch(format!(
                "expected {} at field {}, but the value has only {} field(s)",
                wanted, self.index, self.index
            ))),
        }
    }

    fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodingError> {
        let remaining = self.input.len() - self.cursor;
        if remaining < n {
            return Err(DecodingError::schema_mismatch(format!(
                "field {} truncated: needs {} byte(s), {} remaining",
                self.index.saturating_sub(1),
                n,
                remaining
            )));
        }
        let out = &self.input[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(out)
    }

    fn take_u64(&mut self) -> Result<u64, DecodingError> {
        Ok(BigEndian::read_u64(self.take_bytes(8)?))
    }

    fn take_len_prefixed(&mut self) -> Result<&'a [u8], DecodingError> {
        let len = BigEndian::read_u32(self.take_bytes(4)?) as usize;
        self.take_bytes(len)
    }
}

fn timestamp_from_parts(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, nanos).single()
}

/// A Rust type that can be stored as one record field
///
/// Dispatch is per type through this trait; the tag written in front of each
/// field records which implementation wrote it.
pub trait Field: Sized {
    /// Append this value to `writer`
    fn write_field(&self, writer: &mut FieldWriter);

    /// Read one value of this type from `reader`
    fn read_field(reader: &mut FieldReader<'_>) -> Result<Self, DecodingError>;
}

macro_rules! impl_primitive_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Field for $ty {
                fn write_field(&self, writer: &mut FieldWriter) {
                    writer.put_value(&self.clone().into_value());
                }

                fn read_field(reader: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
                    let value = reader.take_value(<$ty as Primitive>::KIND)?;
                    let kind = value.kind();
                    <$ty as Primitive>::from_value(value)
                        .ok_or_else(|| DecodingError::malformed(kind, "kind changed while decoding"))
                }
            }
        )*
    };
}

impl_primitive_field!(String, u64, i64, Uuid, Vec<u8>, DateTime<Utc>);

impl Field for bool {
    fn write_field(&self, writer: &mut FieldWriter) {
        writer.put_bool(*self);
    }

    fn read_field(reader: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        reader.take_bool()
    }
}

impl Field for f64 {
    fn write_field(&self, writer: &mut FieldWriter) {
        writer.put_f64(*self);
    }

    fn read_field(reader: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        reader.take_f64()
    }
}

impl<T: Field> Field for Option<T> {
    fn write_field(&self, writer: &mut FieldWriter) {
        match self {
            Some(inner) => inner.write_field(writer),
            None => {
                writer.put_null();
            }
        }
    }

    fn read_field(reader: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        if reader.take_null()? {
            return Ok(None);
        }
        T::read_field(reader).map(Some)
    }
}

/// A record split into the bytes the engine stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRecord {
    /// Composite key bytes
    pub key: Vec<u8>,
    /// Version header plus tagged fields
    pub value: Vec<u8>,
}

impl SerializedRecord {
    /// Serialize `record` under `descriptor`
    pub fn encode<R: Record>(
        record: &R,
        descriptor: &RecordDescriptor,
    ) -> Result<Self, EncodingError> {
        let key = descriptor.key_schema().build_key(&record.key_values())?;
        let mut fields = FieldWriter::new(descriptor.schema_version());
        record.write_fields(&mut fields);
        Ok(Self {
            key,
            value: fields.finish()?,
        })
    }

    /// Rebuild a record from stored key and value bytes
    ///
    /// Fails with `SchemaMismatch` unless both the key and every field are
    /// consumed exactly.
    pub fn decode<R: Record>(
        descriptor: &RecordDescriptor,
        key: &[u8],
        value: &[u8],
    ) -> Result<R, DecodingError> {
        let components = descriptor.key_schema().decode_key(key)?;
        let mut fields = FieldReader::new(value, descriptor.schema_version())?;
        let record = R::from_parts(KeyValues::new(components), &mut fields)?;
        fields.finish()?;
        Ok(record)
    }
}
