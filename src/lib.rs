//! Interval lookups and interval joins over header-plus-rows tables.
//!
//! A [`Table`] is a header row of field names followed by data rows of
//! [`Value`]s. This library indexes the half-open `[start, stop)` intervals
//! found in a table's rows and joins tables on interval overlap, optionally
//! scoped by a facet key (a grouping field such as a chromosome name).
//!
//! # Example
//! ```ignore
//! use tabular_intervals::{LookupBuilder, MemTable, row};
//!
//! let table = MemTable::new(
//!     ["start", "stop", "value"],
//!     vec![row![1, 4, "foo"], row![3, 7, "bar"], row![4, 9, "baz"]],
//! );
//!
//! let lkp = LookupBuilder::new("start", "stop").value("value").lookup(&table)?;
//! assert_eq!(lkp.find(2, 4).len(), 2); // foo, bar
//! assert!(lkp.find_point(1).is_empty()); // touching a boundary is not an overlap
//! ```

use std::fmt;

pub mod arrow_table;
pub mod collapse;
pub mod facet;
pub mod fields;
pub mod interval_tree;
pub mod join;
pub mod lookup;
pub mod table;

pub use arrow_table::RecordBatchTable;
pub use collapse::{
    Collapse, CollapsedInterval, collapse, collapsed_intervals, facet_collapsed_intervals,
    subtract,
};
pub use facet::FacetedLookup;
pub use fields::{CoordGetter, Field, FieldGetter, FieldSpec};
pub use interval_tree::{Coord, IntervalTree, IntervalTreeBuilder};
pub use join::{
    IntervalJoin, JoinKind, JoinOptions, interval_anti_join, interval_join, interval_join_values,
    interval_left_join, interval_subtract,
};
pub use lookup::{IntervalLookup, IntervalLookupOne, LookupBuilder, Record, interval_lookup};
pub use table::{MemTable, Rows, Table, collect_rows};

/// A data row: values positionally aligned to the table header.
pub type Row = Vec<Value>;

/// A header row: the ordered field names of a table.
pub type Header = Vec<String>;

/// An insertion-ordered map using ahash for hashing.
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

/// A single cell value.
///
/// Values compare by value: numbers compare across `Int`, `UInt` and `Float`,
/// so `Int(1) == Float(1.0)`, `-0.0 == 0.0` and `NaN == NaN`. Equality,
/// hashing and ordering agree, which makes any value usable as a facet key.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// An ordered group of values: compound keys, compound payloads and
    /// whole-row payloads.
    Tuple(Vec<Value>),
    /// A collected list of values, as appended by a values join.
    List(Vec<Value>),
}

impl Value {
    /// Returns a consistent ordering value for different variants
    fn variant_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Tuple(_) => 4,
            Value::List(_) => 5,
        }
    }

    fn number(&self) -> Option<Number> {
        match *self {
            Value::Int(v) => Some(Number::Integral(v.into())),
            Value::UInt(v) => Some(Number::Integral(v.into())),
            Value::Float(v) => Some(Number::from_float(v)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Read this value as an interval coordinate.
    ///
    /// Only numeric variants are coordinates; everything else returns `None`.
    #[must_use]
    pub fn as_coord(&self) -> Option<interval_tree::Coord> {
        match self {
            Value::Int(v) => Some((*v).into()),
            Value::UInt(v) => Some((*v).into()),
            Value::Float(v) => Some((*v).into()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }

        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Tuple(vs) => {
                write!(f, "(")?;
                join(f, vs)?;
                write!(f, ")")
            }
            Value::List(vs) => {
                write!(f, "[")?;
                join(f, vs)?;
                write!(f, "]")
            }
        }
    }
}

/// The comparable form of a numeric [`Value`].
///
/// Integral floats in the `i64`/`u64` range become `Integral`, which also
/// folds `-0.0` into `0`. Every NaN becomes the one canonical NaN.
#[derive(Clone, Copy, Debug)]
enum Number {
    Integral(i128),
    Fractional(f64),
}

impl Number {
    const MIN_INTEGRAL: f64 = -9_223_372_036_854_775_808.0;
    const MAX_INTEGRAL: f64 = 18_446_744_073_709_551_616.0;

    fn from_float(v: f64) -> Self {
        if v.fract() == 0.0 && (Self::MIN_INTEGRAL..Self::MAX_INTEGRAL).contains(&v) {
            Number::Integral(v as i128)
        } else if v.is_nan() {
            Number::Fractional(f64::NAN)
        } else {
            Number::Fractional(v)
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Number {}

impl std::hash::Hash for Number {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Number::Integral(v) => v.hash(state),
            Number::Fractional(v) => v.to_bits().hash(state),
        }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Number::Integral(a), Number::Integral(b)) => a.cmp(b),
            (Number::Fractional(a), Number::Fractional(b)) => a.total_cmp(b),
            // Ties only arise from rounding the integer; integers sort first
            (Number::Integral(a), Number::Fractional(b)) => (*a as f64)
                .total_cmp(b)
                .then(std::cmp::Ordering::Less),
            (Number::Fractional(a), Number::Integral(b)) => a
                .total_cmp(&(*b as f64))
                .then(std::cmp::Ordering::Greater),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.variant_order().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => self.number().hash(state),
            Value::String(v) => v.hash(state),
            Value::Tuple(vs) | Value::List(vs) => vs.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => std::cmp::Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) | (Value::List(a), Value::List(b)) => a.cmp(b),
            _ => match (self.number(), other.number()) {
                (Some(a), Some(b)) => a.cmp(&b),
                // For mixed types, use a consistent ordering based on variant
                _ => self.variant_order().cmp(&other.variant_order()),
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
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

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Build a [`Row`] from a list of expressions convertible into [`Value`].
///
/// ```ignore
/// let row = row![1, 4, "foo"];
/// ```
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Value::from($value)),*]
    };
}

/// Errors raised while resolving fields, building lookups or running joins.
#[derive(thiserror::Error, Debug)]
pub enum IntervalError {
    /// A named field does not appear in the table header
    #[error("field {field:?} not found in header {available:?}")]
    FieldNotFound {
        field: String,
        available: Vec<String>,
    },

    /// A facet or value field spec resolves to zero fields
    #[error("invalid field spec: {0}")]
    InvalidFieldSpec(String),

    /// A facet field was supplied for exactly one side of a two-table operation
    #[error("facet given for the {given} table only; give facets for both tables or neither")]
    FacetMismatch { given: &'static str },

    /// Left and right facet specs select a different number of fields
    #[error("left facet has {left} fields but right facet has {right}")]
    FacetArity { left: usize, right: usize },

    /// More than one interval matched a strict one-result query
    #[error("{matches} intervals overlap [{start}, {stop}), expected at most one")]
    DuplicateKey {
        start: interval_tree::Coord,
        stop: interval_tree::Coord,
        matches: usize,
    },

    /// An interval bound field holds something other than a number
    #[error("interval bound {field:?} holds non-numeric value {value}")]
    NonNumericBound { field: String, value: Value },

    /// Proximity must be a non-negative number
    #[error("proximity must be a non-negative number, got {0}")]
    InvalidProximity(f64),

    /// Occurs when an Arrow column cannot be presented as table values
    #[error("arrow error: {0}")]
    Arrow(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = IntervalError> = std::result::Result<T, E>;
