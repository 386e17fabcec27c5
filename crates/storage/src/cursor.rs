//! Batched cursor shared by every backend
//!
//! A `Cursor` never materializes a whole table. It asks the transaction for
//! at most `batch_size` pairs at a time and resumes just past the last key it
//! returned, so memory stays bounded by the batch size.

use std::collections::VecDeque;
use std::ops::Bound;

use crate::error::StorageResult;
use crate::traits::{CursorResult, KeyValue, Transaction};

/// Default number of pairs fetched per batch
pub const DEFAULT_BATCH_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    /// Before the first step, or just after a seek
    Unpositioned,
    /// On the last key returned
    At(Vec<u8>),
    /// Walked off the end of the range
    Exhausted,
}

/// Ordered cursor over one table of a transaction
///
/// The cursor borrows its transaction, so it cannot outlive it.
///
/// # Iteration Pattern
///
/// ```
/// use std::ops::Bound;
/// use tuplestore_storage::{MemoryEngine, StorageEngine, Transaction};
///
/// let engine = MemoryEngine::new();
/// let mut txn = engine.begin_write().unwrap();
/// for k in [b"a", b"b", b"c"] {
///     txn.put("t", k, b"").unwrap();
/// }
///
/// let mut cursor = txn.range("t", Bound::Included(&b"b"[..]), Bound::Unbounded);
/// let mut keys = Vec::new();
/// while let Some((key, _)) = cursor.next().unwrap() {
///     keys.push(key);
/// }
/// assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
/// ```
pub struct Cursor<'t, T: Transaction> {
    txn: &'t T,
    table: String,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    batch_size: usize,
    buffer: VecDeque<KeyValue>,
    buffer_reverse: bool,
    position: Position,
}

impl<'t, T: Transaction> Cursor<'t, T> {
    /// Create a cursor over `(lower, upper)` of `table`
    pub fn new(txn: &'t T, table: &str, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Self {
        Self {
            txn,
            table: table.to_string(),
            lower: to_owned_bound(lower),
            upper: to_owned_bound(upper),
            batch_size: DEFAULT_BATCH_SIZE,
            buffer: VecDeque::new(),
            buffer_reverse: false,
            position: Position::Unpositioned,
        }
    }

    /// Set the number of pairs fetched per batch (minimum 1)
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Table this cursor reads
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Key of the pair last returned, if any
    pub fn current_key(&self) -> Option<&[u8]> {
        match &self.position {
            Position::At(key) => Some(key),
            _ => None,
        }
    }

    /// Position at the first key `>= key` inside the range and return it
    pub fn seek(&mut self, key: &[u8]) -> CursorResult {
        self.reset();
        let batch = {
            let start = if above_lower(&self.lower, key) {
                Bound::Included(key)
            } else {
                borrowed(&self.lower)
            };
            self.txn
                .scan(&self.table, start, borrowed(&self.upper), self.batch_size, false)?
        };
        self.buffer = batch.into();
        self.buffer_reverse = false;
        self.step(false)
    }

    /// Position at the first key of the range and return it
    pub fn seek_first(&mut self) -> CursorResult {
        self.reset();
        self.step(false)
    }

    /// Position at the last key of the range and return it
    pub fn seek_last(&mut self) -> CursorResult {
        self.reset();
        self.step(true)
    }

    /// Advance to the next key in ascending order
    ///
    /// Once the range is exhausted every further step returns `None` until
    /// the cursor is repositioned with a seek.
    pub fn next(&mut self) -> CursorResult {
        self.step(false)
    }

    /// Move to the previous key in descending order
    pub fn prev(&mut self) -> CursorResult {
        self.step(true)
    }

    /// Release the cursor
    pub fn close(self) {}

    fn reset(&mut self) {
        self.buffer.clear();
        self.position = Position::Unpositioned;
    }

    fn step(&mut self, reverse: bool) -> CursorResult {
        if self.buffer.is_empty() || self.buffer_reverse != reverse {
            self.refill(reverse)?;
        }
        match self.buffer.pop_front() {
            Some((key, value)) => {
                self.position = Position::At(key.clone());
                Ok(Some((key, value)))
            }
            None => {
                self.position = Position::Exhausted;
                Ok(None)
            }
        }
    }

    fn refill(&mut self, reverse: bool) -> StorageResult<()> {
        let batch = {
            let (lower, upper) = match (&self.position, reverse) {
                (Position::Exhausted, _) => {
                    self.buffer.clear();
                    return Ok(());
                }
                (Position::At(key), false) => (Bound::Excluded(key.as_slice()), borrowed(&self.upper)),
                (Position::At(key), true) => (borrowed(&self.lower), Bound::Excluded(key.as_slice())),
                (Position::Unpositioned, _) => (borrowed(&self.lower), borrowed(&self.upper)),
            };
            self.txn
                .scan(&self.table, lower, upper, self.batch_size, reverse)?
        };
        self.buffer = batch.into();
        self.buffer_reverse = reverse;
        Ok(())
    }
}

fn to_owned_bound(bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(k) => Bound::Included(k.to_vec()),
        Bound::Excluded(k) => Bound::Excluded(k.to_vec()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn borrowed(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(k) => Bound::Included(k.as_slice()),
        Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn above_lower(lower: &Bound<Vec<u8>>, key: &[u8]) -> bool {
    match lower {
        Bound::Included(l) => key >= l.as_slice(),
        Bound::Excluded(l) => key > l.as_slice(),
        Bound::Unbounded => true,
    }
}
