//! Value types for tuplestore
//!
//! This module defines:
//! - Value: closed enum of the primitive types that can appear in a key or field
//! - ValueKind: the type discriminant used by key schemas and field tags
//! - Primitive: conversion trait between Rust types and `Value`
//!
//! ## Canonical Value Model
//!
//! Six kinds only: Text, Uint, Int, Uuid, Bytes, Timestamp.
//!
//! - No implicit coercions: `Uint(1) != Int(1)`
//! - `Bytes` are not `Text`
//! - Values of the same kind order naturally; different kinds order by kind tag

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Discriminant of a primitive value
///
/// The tag byte is persisted in field buffers, so the numbering is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// UTF-8 text
    Text,
    /// 64-bit unsigned integer
    Uint,
    /// 64-bit signed integer
    Int,
    /// 128-bit universally unique identifier
    Uuid,
    /// Opaque byte blob
    Bytes,
    /// Point in time with millisecond resolution once encoded
    Timestamp,
}

impl ValueKind {
    /// All kinds in tag order
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Text,
        ValueKind::Uint,
        ValueKind::Int,
        ValueKind::Uuid,
        ValueKind::Bytes,
        ValueKind::Timestamp,
    ];

    /// Persisted tag byte
    pub const fn tag(self) -> u8 {
        match self {
            ValueKind::Text => 0x01,
            ValueKind::Uint => 0x02,
            ValueKind::Int => 0x03,
            ValueKind::Uuid => 0x04,
            ValueKind::Bytes => 0x05,
            ValueKind::Timestamp => 0x06,
        }
    }

    /// Parse a persisted tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Encoded width for fixed-width kinds, `None` for self-delimiting ones
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            ValueKind::Uint | ValueKind::Int | ValueKind::Timestamp => Some(8),
            ValueKind::Uuid => Some(16),
            ValueKind::Text | ValueKind::Bytes => None,
        }
    }

    /// Lowercase name used in error messages
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Uint => "uint",
            ValueKind::Int => "int",
            ValueKind::Uuid => "uuid",
            ValueKind::Bytes => "bytes",
            ValueKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive value that can be part of an index key or a record field
///
/// Ordering is derived: variants compare by declaration order first, then by
/// payload. Within one kind this is the natural order of the payload, which is
/// exactly what the order-preserving codec reproduces at the byte level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// UTF-8 text
    Text(String),
    /// 64-bit unsigned integer
    Uint(u64),
    /// 64-bit signed integer
    Int(i64),
    /// UUID
    Uuid(Uuid),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Uint(_) => ValueKind::Uint,
            Value::Int(_) => ValueKind::Int,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Get as str if this is a Text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as u64 if this is a Uint value
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as Uuid if this is a Uuid value
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as byte slice if this is a Bytes value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get as timestamp if this is a Timestamp value
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Uint(n) => write!(f, "{}", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::Uuid(id) => write!(f, "{}", id),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

/// Conversion between a Rust type and one `Value` kind
///
/// Record mappings use this to hand typed key components to the key builder
/// and to take them back out after decoding.
pub trait Primitive: Sized {
    /// Kind this type maps to
    const KIND: ValueKind;

    /// Wrap into a `Value`
    fn into_value(self) -> Value;

    /// Unwrap from a `Value`, `None` if the kind differs
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_primitive {
    ($ty:ty, $variant:ident) => {
        impl Primitive for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_primitive!(String, Text);
impl_primitive!(u64, Uint);
impl_primitive!(i64, Int);
impl_primitive!(Uuid, Uuid);
impl_primitive!(Vec<u8>, Bytes);
impl_primitive!(DateTime<Utc>, Timestamp);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Uint(u64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ValueKind::from_tag(0x00), None);
        assert_eq!(ValueKind::from_tag(0x7F), None);
    }

    #[test]
    fn test_kind_tags_unique() {
        let mut tags: Vec<u8> = ValueKind::ALL.iter().map(|k| k.tag()).collect();
        tags.dedup();
        assert_eq!(tags.len(), ValueKind::ALL.len());
    }

    #[test]
    fn test_fixed_width() {
        assert_eq!(ValueKind::Uint.fixed_width(), Some(8));
        assert_eq!(ValueKind::Uuid.fixed_width(), Some(16));
        assert_eq!(ValueKind::Text.fixed_width(), None);
        assert_eq!(ValueKind::Bytes.fixed_width(), None);
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::from("a").kind(), ValueKind::Text);
        assert_eq!(Value::from(1u64).kind(), ValueKind::Uint);
        assert_eq!(Value::from(-1i64).kind(), ValueKind::Int);
        assert_eq!(Value::from(Uuid::nil()).kind(), ValueKind::Uuid);
        assert_eq!(Value::from(vec![1u8]).kind(), ValueKind::Bytes);
        assert_eq!(Value::from(Utc::now()).kind(), ValueKind::Timestamp);
    }

    #[test]
    fn test_no_cross_kind_equality() {
        assert_ne!(Value::Uint(1), Value::Int(1));
        assert_ne!(Value::Text("a".into()), Value::Bytes(b"a".to_vec()));
    }

    #[test]
    fn test_same_kind_natural_order() {
        assert!(Value::Int(-5) < Value::Int(3));
        assert!(Value::Text("ab".into()) < Value::Text("abc".into()));
        assert!(Value::Uint(0) < Value::Uint(u64::MAX));
    }

    #[test]
    fn test_primitive_conversions() {
        let v = "Dallas".to_string().into_value();
        assert_eq!(v.as_text(), Some("Dallas"));
        assert_eq!(String::from_value(v), Some("Dallas".to_string()));
        assert_eq!(u64::from_value(Value::Int(1)), None);
        assert_eq!(<i64 as Primitive>::KIND, ValueKind::Int);
    }

    #[test]
    fn test_accessors_reject_other_kinds() {
        let v = Value::Uint(7);
        assert_eq!(v.as_uint(), Some(7));
        assert!(v.as_int().is_none());
        assert!(v.as_text().is_none());
        assert!(v.as_bytes().is_none());
        assert!(v.as_uuid().is_none());
        assert!(v.as_timestamp().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(Value::Bytes(vec![0; 4]).to_string(), "<4 bytes>");
        assert_eq!(ValueKind::Timestamp.to_string(), "timestamp");
    }
}
