//! Document-record mapping boundary
//!
//! Records sometimes mirror an external structured document (a remote
//! record type, a JSON object). This crate only defines the converter seam;
//! implementations live with the integration that needs them.

use tuplestore_core::DecodingError;

use crate::record::Record;

/// Bidirectional converter between a record and an external document
pub trait DocumentMapping: Record {
    /// External document representation
    type Document;

    /// Build the document for this record
    fn to_document(&self) -> Self::Document;

    /// Rebuild a record from a document
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` when the document lacks a field the record needs.
    fn from_document(document: &Self::Document) -> Result<Self, DecodingError>;
}
