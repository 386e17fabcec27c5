//! Composite index keys
//!
//! A record type declares a `KeySchema`: an ordered, fixed-arity list of named
//! components, each with a `ValueKind`. `build_key` concatenates the
//! order-preserving encodings of the components in position order, so raw byte
//! comparison of two built keys equals component-wise comparison of the
//! tuples they came from.
//!
//! ## Contract
//!
//! For keys `a`, `b` sharing one schema:
//! - `build_key(a) == build_key(b)` iff every component is equal
//! - `build_key(a) < build_key(b)` iff at the first differing position
//!   `a`'s component is smaller
//!
//! No type tags are written: the schema alone drives decoding.

use crate::codec::{decode_value, encode_value};
use crate::error::{DecodingError, EncodingError};
use crate::value::{Value, ValueKind};

/// One named, typed position in a key schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyComponent {
    /// Component name, used by queries to address the position
    pub name: String,
    /// Kind every value at this position must have
    pub kind: ValueKind,
}

impl KeyComponent {
    /// Create a new component
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered key layout of one record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeySchema {
    components: Vec<KeyComponent>,
}

impl KeySchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component (builder style)
    ///
    /// # Example
    ///
    /// ```
    /// use tuplestore_core::{KeySchema, ValueKind};
    ///
    /// let schema = KeySchema::new()
    ///     .with("last_name", ValueKind::Text)
    ///     .with("first_name", ValueKind::Text);
    /// assert_eq!(schema.arity(), 2);
    /// ```
    pub fn with(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.components.push(KeyComponent::new(name, kind));
        self
    }

    /// Components in position order
    pub fn components(&self) -> &[KeyComponent] {
        &self.components
    }

    /// Number of components
    pub fn arity(&self) -> usize {
        self.components.len()
    }

    /// Position of the component called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name == name)
    }

    /// Component at `position`
    pub fn component(&self, position: usize) -> Option<&KeyComponent> {
        self.components.get(position)
    }

    /// Check that `values` has this schema's arity and per-position kinds
    pub fn validate(&self, values: &[Value]) -> Result<(), EncodingError> {
        if values.len() != self.components.len() {
            return Err(EncodingError::ArityMismatch {
                expected: self.components.len(),
                actual: values.len(),
            });
        }
        for (component, value) in self.components.iter().zip(values) {
            check_kind(component, value)?;
        }
        Ok(())
    }

    /// Build the composite key bytes for a full key tuple
    pub fn build_key(&self, values: &[Value]) -> Result<Vec<u8>, EncodingError> {
        self.validate(values)?;
        let mut out = Vec::with_capacity(values.len() * 8);
        for value in values {
            encode_value(value, &mut out);
        }
        Ok(out)
    }

    /// Build the encoded prefix for the first `values.len()` components
    ///
    /// Used by the query compiler for equality prefixes.
    pub fn build_prefix(&self, values: &[Value]) -> Result<Vec<u8>, EncodingError> {
        if values.len() > self.components.len() {
            return Err(EncodingError::ArityMismatch {
                expected: self.components.len(),
                actual: values.len(),
            });
        }
        let mut out = Vec::new();
        for (component, value) in self.components.iter().zip(values) {
            check_kind(component, value)?;
            encode_value(value, &mut out);
        }
        Ok(out)
    }

    /// Decode composite key bytes back into component values
    ///
    /// Fails with `SchemaMismatch` unless the input is consumed exactly.
    pub fn decode_key(&self, bytes: &[u8]) -> Result<Vec<Value>, DecodingError> {
        let mut cursor = 0;
        let mut values = Vec::with_capacity(self.components.len());
        for component in &self.components {
            values.push(decode_value(component.kind, bytes, &mut cursor)?);
        }
        if cursor != bytes.len() {
            return Err(DecodingError::schema_mismatch(format!(
                "key has {} trailing byte(s) after {} component(s)",
                bytes.len() - cursor,
                self.components.len()
            )));
        }
        Ok(values)
    }
}

fn check_kind(component: &KeyComponent, value: &Value) -> Result<(), EncodingError> {
    if value.kind() != component.kind {
        return Err(EncodingError::KindMismatch {
            component: component.name.clone(),
            expected: component.kind,
            actual: value.kind(),
        });
    }
    Ok(())
}

/// Smallest byte string greater than every string that starts with `prefix`
///
/// Returns `None` when no such bound exists (empty prefix or all `0xFF`),
/// meaning the range is open at the top.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last < 0xFF {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}
