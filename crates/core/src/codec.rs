//! Order-preserving binary codec
//!
//! Every primitive kind is encoded so that unsigned lexicographic comparison of
//! the encoded bytes matches the natural ordering of the values. Encodings are
//! self-delimiting (fixed width, or escaped and terminated) so they can be
//! concatenated into composite keys without one component bleeding into the
//! next.
//!
//! ## Layout
//!
//! | Kind      | Encoding                                             |
//! |-----------|------------------------------------------------------|
//! | Uint      | 8 bytes big-endian                                   |
//! | Int       | 8 bytes big-endian, sign bit flipped                 |
//! | Uuid      | 16 raw bytes                                         |
//! | Timestamp | epoch millis as i64, sign bit flipped, 8 bytes BE    |
//! | Text      | UTF-8 bytes, escaped, then `0x00 0x01`               |
//! | Bytes     | raw bytes, escaped, then `0x00 0x01`                 |
//!
//! ## Variable-length components
//!
//! A `0x00` payload byte is written as `0x00 0xFF`. The terminator `0x00 0x01`
//! sorts below both an escaped NUL and every literal non-zero byte, so a
//! shorter string always sorts before its extensions (`"ab" < "abc"`), even
//! when further key components follow. A length prefix would not give this:
//! it compares the lengths before the content.
//!
//! ## Timestamps
//!
//! Timestamps keep millisecond resolution only. Anything finer is truncated
//! (towards negative infinity) and cannot be recovered. Use
//! [`precision_loss`] to detect values that will not round-trip.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{DecodingError, EncodingError};
use crate::value::{Value, ValueKind};

/// Flips the sign bit so two's complement order matches unsigned byte order
const SIGN_FLIP: u64 = 0x8000_0000_0000_0000;

/// Escape lead byte inside variable-length payloads
const ESCAPE: u8 = 0x00;
/// Follows `ESCAPE` for a literal `0x00` payload byte
const ESCAPED_NUL: u8 = 0xFF;
/// Follows `ESCAPE` to end the component
const TERMINATOR: u8 = 0x01;

const NANOS_PER_MILLI: u32 = 1_000_000;

/// Append the order-preserving encoding of `value` to `out`
///
/// Never fails. Timestamps are truncated to milliseconds.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Uint(n) => push_u64(out, *n),
        Value::Int(n) => push_u64(out, ordered_i64(*n)),
        Value::Uuid(id) => out.extend_from_slice(id.as_bytes()),
        Value::Timestamp(ts) => push_u64(out, ordered_i64(ts.timestamp_millis())),
        Value::Text(s) => encode_escaped(s.as_bytes(), out),
        Value::Bytes(b) => encode_escaped(b, out),
    }
}

/// Encode a single value into a fresh buffer
pub fn encode_to_vec(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len_hint(value));
    encode_value(value, &mut out);
    out
}

/// Report whether encoding `value` drops information
///
/// Returns `Some(EncodingError::PrecisionLoss)` for timestamps with
/// sub-millisecond precision, `None` otherwise. Advisory only.
pub fn precision_loss(value: &Value) -> Option<EncodingError> {
    match value {
        Value::Timestamp(ts) => {
            let dropped_nanos = ts.timestamp_subsec_nanos() % NANOS_PER_MILLI;
            (dropped_nanos != 0).then_some(EncodingError::PrecisionLoss { dropped_nanos })
        }
        _ => None,
    }
}

/// Truncate a timestamp to the resolution the codec keeps
///
/// `decode(encode(ts)) == truncate_timestamp(ts)` for every timestamp.
pub fn truncate_timestamp(ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ts.timestamp_millis()).single()
}

/// Decode one value of `kind` starting at `*cursor`
///
/// On success `*cursor` is advanced past the consumed bytes. On failure the
/// cursor position is unspecified.
pub fn decode_value(
    kind: ValueKind,
    input: &[u8],
    cursor: &mut usize,
) -> Result<Value, DecodingError> {
    match kind {
        ValueKind::Uint => Ok(Value::Uint(read_u64(kind, input, cursor)?)),
        ValueKind::Int => Ok(Value::Int(unordered_i64(read_u64(kind, input, cursor)?))),
        ValueKind::Uuid => {
            let raw = take(kind, input, cursor, 16)?;
            let id = Uuid::from_slice(raw)
                .map_err(|e| DecodingError::malformed(kind, e.to_string()))?;
            Ok(Value::Uuid(id))
        }
        ValueKind::Timestamp => {
            let millis = unordered_i64(read_u64(kind, input, cursor)?);
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(Value::Timestamp)
                .ok_or_else(|| {
                    DecodingError::malformed(kind, format!("{} ms is out of range", millis))
                })
        }
        ValueKind::Text => {
            let raw = decode_escaped(kind, input, cursor)?;
            String::from_utf8(raw)
                .map(Value::Text)
                .map_err(|e| DecodingError::malformed(kind, e.to_string()))
        }
        ValueKind::Bytes => Ok(Value::Bytes(decode_escaped(kind, input, cursor)?)),
    }
}

/// Decode a buffer that must hold exactly one value of `kind`
pub fn decode_exact(kind: ValueKind, input: &[u8]) -> Result<Value, DecodingError> {
    let mut cursor = 0;
    let value = decode_value(kind, input, &mut cursor)?;
    if cursor != input.len() {
        return Err(DecodingError::schema_mismatch(format!(
            "{} trailing byte(s) after {} value",
            input.len() - cursor,
            kind
        )));
    }
    Ok(value)
}

// ============================================================================
// Fixed-width helpers
// ============================================================================

/// Map i64 onto u64 preserving order
#[inline]
fn ordered_i64(n: i64) -> u64 {
    (n as u64) ^ SIGN_FLIP
}

/// Inverse of `ordered_i64`
#[inline]
fn unordered_i64(n: u64) -> i64 {
    (n ^ SIGN_FLIP) as i64
}

fn push_u64(out: &mut Vec<u8>, n: u64) {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, n);
    out.extend_from_slice(&buf);
}

fn read_u64(kind: ValueKind, input: &[u8], cursor: &mut usize) -> Result<u64, DecodingError> {
    take(kind, input, cursor, 8).map(BigEndian::read_u64)
}

fn take<'a>(
    kind: ValueKind,
    input: &'a [u8],
    cursor: &mut usize,
    len: usize,
) -> Result<&'a [u8], DecodingError> {
    let remaining = input.len().saturating_sub(*cursor);
    if remaining < len {
        return Err(DecodingError::TruncatedInput {
            kind,
            needed: len,
            remaining,
        });
    }
    let slice = &input[*cursor..*cursor + len];
    *cursor += len;
    Ok(slice)
}

fn encoded_len_hint(value: &Value) -> usize {
    match value {
        Value::Text(s) => s.len() + 2,
        Value::Bytes(b) => b.len() + 2,
        other => other.kind().fixed_width().unwrap_or(0),
    }
}

// ============================================================================
// Escaped variable-length payloads
// ============================================================================

fn encode_escaped(data: &[u8], out: &mut Vec<u8>) {
    out.reserve(data.len() + 2);
    for &byte in data {
        if byte == ESCAPE {
            out.push(ESCAPE);
            out.push(ESCAPED_NUL);
        } else {
            out.push(byte);
        }
    }
    out.push(ESCAPE);
    out.push(TERMINATOR);
}

fn decode_escaped(
    kind: ValueKind,
    input: &[u8],
    cursor: &mut usize,
) -> Result<Vec<u8>, DecodingError> {
    let mut result = Vec::new();
    let mut i = *cursor;

    loop {
        let Some(&byte) = input.get(i) else {
            return Err(DecodingError::TruncatedInput {
                kind,
                needed: 2,
                remaining: 0,
            });
        };

        if byte != ESCAPE {
            result.push(byte);
            i += 1;
            continue;
        }

        match input.get(i + 1) {
            Some(&TERMINATOR) => {
                *cursor = i + 2;
                return Ok(result);
            }
            Some(&ESCAPED_NUL) => {
                result.push(0x00);
                i += 2;
            }
            Some(&other) => {
                return Err(DecodingError::malformed(
                    kind,
                    format!("invalid escape sequence 0x00 0x{:02x}", other),
                ));
            }
            None => {
                return Err(DecodingError::TruncatedInput {
                    kind,
                    needed: 1,
                    remaining: 0,
                });
            }
        }
    }
}
