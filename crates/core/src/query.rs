//! Query constraints and the range compiler
//!
//! A `KeyQuery` constrains key components by name. The compiler validates the
//! combination against the key ordering rules and turns it into one contiguous
//! byte range over composite keys.
//!
//! ## Valid arrangements
//!
//! Constraints must form an equality prefix followed by at most one range
//! predicate, with every later component unconstrained:
//!
//! ```text
//! (= a)                    ok   prefix scan
//! (= a, = b)               ok   exact match
//! (= a, <= b)              ok   prefix + trailing range
//! (> a)                    ok   range on first component
//! (< a, <= b)              rejected: constraint after a range
//! (= a, _, = c)            rejected: gap before a constrained component
//! ```
//!
//! ## Compilation
//!
//! With `P` the encoded equality prefix and `succ(x)` the smallest byte string
//! above every extension of `x` (see [`prefix_successor`]):
//!
//! | Predicate | Lower (inclusive)   | Upper (exclusive)   |
//! |-----------|---------------------|---------------------|
//! | none      | `P`                 | `succ(P)`           |
//! | `> v`     | `succ(P + enc(v))`  | `succ(P)`           |
//! | `>= v`    | `P + enc(v)`        | `succ(P)`           |
//! | `< v`     | `P`                 | `P + enc(v)`        |
//! | `<= v`    | `P`                 | `succ(P + enc(v))`  |
//!
//! Encodings are prefix-free, so `succ(P + enc(v))` skips exactly the keys
//! whose ranged component equals `v`, whatever follows it.

use std::ops::Bound;

use tracing::trace;

use crate::codec::encode_value;
use crate::error::QueryError;
use crate::key::{prefix_successor, KeySchema};
use crate::value::Value;

/// Comparison applied to one key component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// component == value
    Eq(Value),
    /// component < value
    Lt(Value),
    /// component <= value
    Le(Value),
    /// component > value
    Gt(Value),
    /// component >= value
    Ge(Value),
}

impl Predicate {
    /// Bound value of the predicate
    pub fn value(&self) -> &Value {
        match self {
            Predicate::Eq(v)
            | Predicate::Lt(v)
            | Predicate::Le(v)
            | Predicate::Gt(v)
            | Predicate::Ge(v) => v,
        }
    }

    /// True for every predicate except `Eq`
    pub fn is_range(&self) -> bool {
        !matches!(self, Predicate::Eq(_))
    }
}

/// A predicate attached to a named key component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Name of the key component
    pub component: String,
    /// Predicate on that component
    pub predicate: Predicate,
}

/// Set of per-component constraints for one select
///
/// # Example
///
/// ```
/// use tuplestore_core::KeyQuery;
///
/// let query = KeyQuery::new()
///     .eq("last_name", "Dallas")
///     .le("first_name", "Korben");
/// assert_eq!(query.constraints().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyQuery {
    constraints: Vec<Constraint>,
}

impl KeyQuery {
    /// Query with no constraints (full scan of the record type)
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an arbitrary predicate
    pub fn constrain(mut self, component: impl Into<String>, predicate: Predicate) -> Self {
        self.constraints.push(Constraint {
            component: component.into(),
            predicate,
        });
        self
    }

    /// `component == value`
    pub fn eq(self, component: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constrain(component, Predicate::Eq(value.into()))
    }

    /// `component < value`
    pub fn lt(self, component: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constrain(component, Predicate::Lt(value.into()))
    }

    /// `component <= value`
    pub fn le(self, component: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constrain(component, Predicate::Le(value.into()))
    }

    /// `component > value`
    pub fn gt(self, component: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constrain(component, Predicate::Gt(value.into()))
    }

    /// `component >= value`
    pub fn ge(self, component: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constrain(component, Predicate::Ge(value.into()))
    }

    /// Constraints in insertion order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// True when no component is constrained
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Order in which a cursor walks a compiled range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    /// Ascending key order
    #[default]
    Forward,
    /// Descending key order
    Reverse,
}

/// Byte range over composite keys produced by [`compile`]
///
/// The lower bound is inclusive or unbounded, the upper bound exclusive or
/// unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRange {
    /// Lower bound of the scan
    pub lower: Bound<Vec<u8>>,
    /// Upper bound of the scan
    pub upper: Bound<Vec<u8>>,
    /// Scan direction; the compiler always emits `Forward`
    pub direction: ScanDirection,
}

impl CompiledRange {
    /// Range covering the whole key space of a record type
    pub fn full() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            direction: ScanDirection::Forward,
        }
    }

    /// Key a cursor should seek to, `None` to start at the first key
    pub fn seek_key(&self) -> Option<&[u8]> {
        match &self.lower {
            Bound::Included(k) | Bound::Excluded(k) => Some(k),
            Bound::Unbounded => None,
        }
    }

    /// True if `key` lies below the upper bound
    pub fn below_upper(&self, key: &[u8]) -> bool {
        match &self.upper {
            Bound::Included(u) => key <= u.as_slice(),
            Bound::Excluded(u) => key < u.as_slice(),
            Bound::Unbounded => true,
        }
    }

    /// True if `key` lies above the lower bound
    pub fn above_lower(&self, key: &[u8]) -> bool {
        match &self.lower {
            Bound::Included(l) => key >= l.as_slice(),
            Bound::Excluded(l) => key > l.as_slice(),
            Bound::Unbounded => true,
        }
    }

    /// True if `key` is inside the range
    pub fn contains(&self, key: &[u8]) -> bool {
        self.above_lower(key) && self.below_upper(key)
    }

    /// True if no key can satisfy both bounds
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(l), Bound::Excluded(u)) => l >= u,
            (Bound::Included(l), Bound::Included(u)) => l > u,
            (Bound::Excluded(l), Bound::Excluded(u) | Bound::Included(u)) => l >= u,
            _ => false,
        }
    }

    /// Same range walked in the given direction
    pub fn with_direction(mut self, direction: ScanDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Validate `query` against `schema` and compile it into a byte range
///
/// # Errors
///
/// - `UnknownComponent` if a constraint names a component the schema lacks
/// - `DuplicateConstraint` if a component is constrained twice
/// - `KindMismatch` if a bound value has the wrong kind
/// - `InvalidKeyArrangement` if the constraints are not an equality prefix
///   plus at most one trailing range predicate
pub fn compile(schema: &KeySchema, query: &KeyQuery) -> Result<CompiledRange, QueryError> {
    let slots = validate(schema, query)?;

    let mut prefix = Vec::new();
    let mut ranged: Option<&Predicate> = None;
    for predicate in slots.into_iter().flatten() {
        match predicate {
            Predicate::Eq(value) => encode_value(value, &mut prefix),
            other => ranged = Some(other),
        }
    }

    let prefix_lower = if prefix.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Included(prefix.clone())
    };
    let prefix_upper = upper_after(&prefix);

    let (lower, upper) = match ranged {
        None => (prefix_lower, prefix_upper),
        Some(predicate) => {
            let mut bound = prefix.clone();
            encode_value(predicate.value(), &mut bound);
            match predicate {
                Predicate::Gt(_) => match prefix_successor(&bound) {
                    Some(succ) => (Bound::Included(succ), prefix_upper),
                    // Nothing sorts after an all-0xFF bound and its extensions
                    None => (Bound::Excluded(bound.clone()), Bound::Excluded(bound)),
                },
                Predicate::Ge(_) => (Bound::Included(bound), prefix_upper),
                Predicate::Lt(_) => (prefix_lower, Bound::Excluded(bound)),
                Predicate::Le(_) | Predicate::Eq(_) => (prefix_lower, upper_after(&bound)),
            }
        }
    };

    let range = CompiledRange {
        lower,
        upper,
        direction: ScanDirection::Forward,
    };
    trace!(target: "tuplestore::query", ?range, "compiled key range");
    Ok(range)
}

/// Check the constraint arrangement, returning predicates by key position
pub fn validate<'q>(
    schema: &KeySchema,
    query: &'q KeyQuery,
) -> Result<Vec<Option<&'q Predicate>>, QueryError> {
    let mut slots: Vec<Option<&Predicate>> = vec![None; schema.arity()];

    for constraint in query.constraints() {
        let position = schema
            .position(&constraint.component)
            .ok_or_else(|| QueryError::UnknownComponent(constraint.component.clone()))?;
        if slots[position].is_some() {
            return Err(QueryError::DuplicateConstraint(constraint.component.clone()));
        }
        let expected = schema.components()[position].kind;
        let actual = constraint.predicate.value().kind();
        if expected != actual {
            return Err(QueryError::KindMismatch {
                component: constraint.component.clone(),
                expected,
                actual,
            });
        }
        slots[position] = Some(&constraint.predicate);
    }

    let mut range_on: Option<&str> = None;
    let mut gap_at: Option<&str> = None;
    for (component, slot) in schema.components().iter().zip(&slots) {
        let Some(predicate) = slot else {
            gap_at.get_or_insert(component.name.as_str());
            continue;
        };
        if let Some(ranged) = range_on {
            return Err(QueryError::InvalidKeyArrangement(format!(
                "component '{}' is constrained after range predicate on '{}'",
                component.name, ranged
            )));
        }
        if let Some(gap) = gap_at {
            return Err(QueryError::InvalidKeyArrangement(format!(
                "component '{}' is constrained but earlier component '{}' is not",
                component.name, gap
            )));
        }
        if predicate.is_range() {
            range_on = Some(component.name.as_str());
        }
    }

    Ok(slots)
}

fn upper_after(bytes: &[u8]) -> Bound<Vec<u8>> {
    match prefix_successor(bytes) {
        Some(succ) => Bound::Excluded(succ),
        None => Bound::Unbounded,
    }
}
