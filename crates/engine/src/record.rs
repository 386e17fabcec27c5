//! Record mapping contract
//!
//! A `Record` tells the store how one Rust type is laid out:
//! - which sub-database it lives in and what its key schema is
//! - how to pull key component values out of an instance
//! - how to write and read its non-key fields
//!
//! Implementations are usually mechanical. See the `Person` example on
//! [`Record`].

use std::collections::VecDeque;

use tuplestore_core::{DecodingError, KeySchema, Primitive, Value};

use crate::fields::{FieldReader, FieldWriter};

/// What `insert` does when the key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPolicy {
    /// Replace the stored record
    #[default]
    Overwrite,
    /// Fail with `StorageError::DuplicateKey`
    RejectDuplicates,
}

/// Static description of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    name: String,
    key_schema: KeySchema,
    schema_version: u32,
    insert_policy: InsertPolicy,
}

impl RecordDescriptor {
    /// Describe a record type stored in sub-database `name`
    ///
    /// Starts at schema version 1 with [`InsertPolicy::Overwrite`].
    pub fn new(name: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            name: name.into(),
            key_schema,
            schema_version: 1,
            insert_policy: InsertPolicy::Overwrite,
        }
    }

    /// Set the schema version stamped on every stored value
    #[must_use]
    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    /// Set the duplicate-key policy
    #[must_use]
    pub fn with_insert_policy(mut self, policy: InsertPolicy) -> Self {
        self.insert_policy = policy;
        self
    }

    /// Sub-database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key layout
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Schema version of the field layout
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Duplicate-key policy
    pub fn insert_policy(&self) -> InsertPolicy {
        self.insert_policy
    }
}

/// Mapping between a Rust type and its stored key and fields
///
/// # Example
///
/// ```
/// use tuplestore_core::{DecodingError, KeySchema, Value, ValueKind};
/// use tuplestore_engine::{FieldReader, FieldWriter, KeyValues, Record, RecordDescriptor};
///
/// struct Person {
///     last_name: String,
///     first_name: String,
///     age: u64,
/// }
///
/// impl Record for Person {
///     fn descriptor() -> RecordDescriptor {
///         RecordDescriptor::new(
///             "people",
///             KeySchema::new()
///                 .with("last_name", ValueKind::Text)
///                 .with("first_name", ValueKind::Text),
///         )
///     }
///
///     fn key_values(&self) -> Vec<Value> {
///         vec![self.last_name.clone().into(), self.first_name.clone().into()]
///     }
///
///     fn write_fields(&self, fields: &mut FieldWriter) {
///         fields.put(&self.age);
///     }
///
///     fn from_parts(mut key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
///         Ok(Person {
///             last_name: key.take()?,
///             first_name: key.take()?,
///             age: fields.take()?,
///         })
///     }
/// }
/// ```
pub trait Record: Sized {
    /// Sub-database, key schema, schema version and insert policy
    fn descriptor() -> RecordDescriptor;

    /// Key component values in key schema order
    fn key_values(&self) -> Vec<Value>;

    /// Write the non-key fields
    fn write_fields(&self, fields: &mut FieldWriter);

    /// Rebuild an instance from decoded key components and the field reader
    fn from_parts(key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError>;
}

/// Decoded key components handed to [`Record::from_parts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValues {
    values: VecDeque<Value>,
    taken: usize,
}

impl KeyValues {
    /// Wrap decoded components
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
            taken: 0,
        }
    }

    /// Take the next component as a typed primitive
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if no component is left or its kind differs.
    pub fn take<P: Primitive>(&mut self) -> Result<P, DecodingError> {
        let position = self.taken;
        let value = self.values.pop_front().ok_or_else(|| {
            DecodingError::schema_mismatch(format!("key has no component at position {}", position))
        })?;
        self.taken += 1;
        let kind = value.kind();
        P::from_value(value).ok_or_else(|| {
            DecodingError::schema_mismatch(format!(
                "key component {} is {}, expected {}",
                position,
                kind,
                P::KIND
            ))
        })
    }

    /// Take the next component as an untyped value
    pub fn take_value(&mut self) -> Option<Value> {
        let value = self.values.pop_front()?;
        self.taken += 1;
        Some(value)
    }

    /// Number of components not yet taken
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Remaining components
    pub fn into_vec(self) -> Vec<Value> {
        self.values.into()
    }
}
