//! Shared records and helpers for the record store suite.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;
use tuplestore::{
    DecodingError, FieldReader, FieldWriter, KeySchema, KeyValues, Record, RecordDescriptor,
    Value, ValueKind,
};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Route store logs to the test writer. Safe to call from every test.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A temporary data directory that is removed on drop
pub struct TestDir {
    pub dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        init_tracing();
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store")
    }
}

/// Ship log entry keyed by (vessel, logged_at)
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub vessel: Uuid,
    pub logged_at: DateTime<Utc>,
    pub author: String,
    pub body: Vec<u8>,
    pub heading: f64,
    pub urgent: bool,
    pub sequence: i64,
}

impl Record for LogEntry {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new(
            "log_entries",
            KeySchema::new()
                .with("vessel", ValueKind::Uuid)
                .with("logged_at", ValueKind::Timestamp),
        )
    }

    fn key_values(&self) -> Vec<Value> {
        vec![self.vessel.into(), self.logged_at.into()]
    }

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields
            .put(&self.author)
            .put(&self.body)
            .put(&self.heading)
            .put(&self.urgent)
            .put(&self.sequence);
    }

    fn from_parts(mut key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        Ok(LogEntry {
            vessel: key.take()?,
            logged_at: key.take()?,
            author: fields.take()?,
            body: fields.take()?,
            heading: fields.take()?,
            urgent: fields.take()?,
            sequence: fields.take()?,
        })
    }
}

/// Millisecond-aligned timestamp, so key truncation is lossless
pub fn at_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap()
}

pub fn entry(vessel: Uuid, millis: i64, author: &str) -> LogEntry {
    LogEntry {
        vessel,
        logged_at: at_millis(millis),
        author: author.to_string(),
        body: vec![0x00, 0xFF, 0x00, 0x01],
        heading: 271.5,
        urgent: millis % 2 == 0,
        sequence: -millis,
    }
}
