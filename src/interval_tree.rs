//! Interval tree over half-open `[start, stop)` intervals.
//!
//! The tree is backed by the `intervaltree` crate and is immutable once built:
//! entries are inserted into an [`IntervalTreeBuilder`], then frozen with
//! [`IntervalTreeBuilder::build`].
//!
//! A query `[x, y)` returns every payload whose stored interval `[a, b)`
//! satisfies `a < y && b > x`. Results come back in insertion order.
//!
//! Two consequences of that rule are relied upon by callers:
//! - a point query (`x == y`) matches only intervals strictly straddling the
//!   point, never one that merely touches it at an endpoint;
//! - a degenerate stored interval `[a, a)` is never returned by a point query,
//!   not even at `a` itself.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Range, Sub};

use intervaltree::Element;

/// A numeric interval coordinate.
///
/// Integers and floats are both held as `f64`, totally ordered with
/// [`f64::total_cmp`] so they can key the tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct Coord(f64);

impl Coord {
    #[must_use]
    pub fn new(v: f64) -> Self {
        // Fold -0.0 into 0.0 so the total order agrees with numeric equality.
        Self(v + 0.0)
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Convert back into a [`crate::Value`], as an integer when `template` is an
    /// integer and this coordinate is integral.
    #[must_use]
    pub fn to_value_like(self, template: &crate::Value) -> crate::Value {
        use crate::Value;

        let integral = self.0.fract() == 0.0;
        match template {
            Value::Int(_) if integral && self.0.abs() < 9.0e15 => Value::Int(self.0 as i64),
            Value::UInt(_) if integral && (0.0..1.8e19).contains(&self.0) => {
                Value::UInt(self.0 as u64)
            }
            _ => Value::Float(self.0),
        }
    }
}

impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Coord {}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<f64> for Coord {
    type Output = Coord;

    fn add(self, rhs: f64) -> Coord {
        Coord::new(self.0 + rhs)
    }
}

impl Sub<f64> for Coord {
    type Output = Coord;

    fn sub(self, rhs: f64) -> Coord {
        Coord::new(self.0 - rhs)
    }
}

macro_rules! coord_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Coord {
                fn from(v: $t) -> Self {
                    Coord::new(v as f64)
                }
            }
        )*
    };
}

coord_from!(i32, i64, u32, u64, usize, f32, f64);

/// Stored payload tagged with its insertion sequence number.
struct Slot<V> {
    seq: usize,
    value: V,
}

/// Whether the stored interval `range` has a nonzero overlap with `[start, stop)`.
#[must_use]
pub fn overlaps(range: &Range<Coord>, start: Coord, stop: Coord) -> bool {
    range.start < stop && range.end > start
}

/// An immutable interval tree mapping `[start, stop)` intervals to payloads.
///
/// Duplicate intervals are legal and each is returned independently.
pub struct IntervalTree<V> {
    tree: intervaltree::IntervalTree<Coord, Slot<V>>,
    len: usize,
}

impl<V> IntervalTree<V> {
    #[must_use]
    pub fn builder() -> IntervalTreeBuilder<V> {
        IntervalTreeBuilder::default()
    }

    /// Number of stored intervals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All payloads overlapping `[start, stop)`, in insertion order.
    #[must_use]
    pub fn query(&self, start: Coord, stop: Coord) -> Vec<&V> {
        self.query_entries(start, stop)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// As [`IntervalTree::query`], with the stored interval of each match.
    #[must_use]
    pub fn query_entries(&self, start: Coord, stop: Coord) -> Vec<(&Range<Coord>, &V)> {
        // The backing tree narrows the candidates; the overlap rule and the
        // insertion order are enforced here.
        let candidates: Box<dyn Iterator<Item = &Element<Coord, Slot<V>>> + '_> =
            match start.cmp(&stop) {
                Ordering::Less => Box::new(self.tree.query(start..stop)),
                Ordering::Equal => Box::new(self.tree.query_point(start)),
                Ordering::Greater => Box::new(self.tree.query(stop..start)),
            };

        let mut hits: Vec<_> = candidates
            .filter(|entry| overlaps(&entry.range, start, stop))
            .collect();
        hits.sort_by_key(|entry| entry.value.seq);

        hits.into_iter()
            .map(|entry| (&entry.range, &entry.value.value))
            .collect()
    }
}

impl<V> fmt::Debug for IntervalTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalTree")
            .field("len", &self.len)
            .finish()
    }
}

impl<V> FromIterator<(Coord, Coord, V)> for IntervalTree<V> {
    fn from_iter<I: IntoIterator<Item = (Coord, Coord, V)>>(iter: I) -> Self {
        let mut builder = IntervalTreeBuilder::default();
        for (start, stop, value) in iter {
            builder.insert(start, stop, value);
        }
        builder.build()
    }
}

/// Accumulates intervals for an [`IntervalTree`].
pub struct IntervalTreeBuilder<V> {
    entries: Vec<(Range<Coord>, Slot<V>)>,
}

impl<V> Default for IntervalTreeBuilder<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> IntervalTreeBuilder<V> {
    /// Add an interval. Insertion order is the tie-break order of query results.
    pub fn insert(&mut self, start: impl Into<Coord>, stop: impl Into<Coord>, value: V) {
        let seq = self.entries.len();
        self.entries
            .push((start.into()..stop.into(), Slot { seq, value }));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the accumulated intervals into a queryable tree.
    #[must_use]
    pub fn build(self) -> IntervalTree<V> {
        let len = self.entries.len();
        IntervalTree {
            tree: self.entries.into_iter().collect(),
            len,
        }
    }
}
