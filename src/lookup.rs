//! Single-key interval lookups.
//!
//! An [`IntervalLookup`] wraps one [`IntervalTree`] together with a proximity
//! tolerance `p`. A range query `[start, stop)` is widened to
//! `[start - p, stop + p)` and a point query `q` to `[q - p, q + p)` before the
//! tree's overlap test, so with `p == 0` a point only matches intervals that
//! strictly straddle it.
//!
//! [`IntervalLookupOne`] reduces the matches of the same query to at most one
//! result, either failing on ambiguity (strict) or taking the first match in
//! insertion order (lenient).

use std::ops::Range;

use log::debug;

use crate::fields::{CoordGetter, Field, FieldGetter, FieldSpec};
use crate::interval_tree::{Coord, IntervalTree};
use crate::table::Table;
use crate::{IntervalError, Result, Value};

/// A row as a mapping from field name to value, in header order.
pub type Record = indexmap::IndexMap<String, Value, ahash::RandomState>;

/// Interval lookup returning every matching payload.
#[derive(Debug)]
pub struct IntervalLookup<V> {
    tree: IntervalTree<V>,
    proximity: f64,
}

impl<V> IntervalLookup<V> {
    /// Wrap a tree, querying it with the given proximity tolerance.
    pub fn new(tree: IntervalTree<V>, proximity: f64) -> Result<Self> {
        check_proximity(proximity)?;
        Ok(Self::with_proximity(tree, proximity))
    }

    pub(crate) fn with_proximity(tree: IntervalTree<V>, proximity: f64) -> Self {
        Self { tree, proximity }
    }

    #[must_use]
    pub fn proximity(&self) -> f64 {
        self.proximity
    }

    #[must_use]
    pub fn tree(&self) -> &IntervalTree<V> {
        &self.tree
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// All payloads whose interval overlaps `[start, stop)` widened by the
    /// proximity, in insertion order.
    #[must_use]
    pub fn find(&self, start: impl Into<Coord>, stop: impl Into<Coord>) -> Vec<&V> {
        self.find_entries(start.into(), stop.into())
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// All payloads whose interval contains `point` widened by the proximity.
    #[must_use]
    pub fn find_point(&self, point: impl Into<Coord>) -> Vec<&V> {
        let point = point.into();
        self.find(point, point)
    }

    /// As [`IntervalLookup::find`], with the stored interval of each match.
    #[must_use]
    pub fn find_entries(&self, start: Coord, stop: Coord) -> Vec<(&Range<Coord>, &V)> {
        self.tree
            .query_entries(start - self.proximity, stop + self.proximity)
    }
}

/// Interval lookup returning at most one payload per query.
#[derive(Debug)]
pub struct IntervalLookupOne<V> {
    inner: IntervalLookup<V>,
    strict: bool,
}

impl<V> IntervalLookupOne<V> {
    /// In strict mode a query with several matches fails with
    /// [`IntervalError::DuplicateKey`]; otherwise the first match in insertion
    /// order wins.
    #[must_use]
    pub fn new(inner: IntervalLookup<V>, strict: bool) -> Self {
        Self { inner, strict }
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub fn inner(&self) -> &IntervalLookup<V> {
        &self.inner
    }

    /// The single payload overlapping `[start, stop)`, or `None`.
    pub fn find(&self, start: impl Into<Coord>, stop: impl Into<Coord>) -> Result<Option<&V>> {
        let (start, stop) = (start.into(), stop.into());
        self.reduce(start, stop, self.inner.find(start, stop))
    }

    /// The single payload containing `point`, or `None`.
    pub fn find_point(&self, point: impl Into<Coord>) -> Result<Option<&V>> {
        let point = point.into();
        self.reduce(point, point, self.inner.find_point(point))
    }

    fn reduce<'a>(&self, start: Coord, stop: Coord, hits: Vec<&'a V>) -> Result<Option<&'a V>> {
        match hits.len() {
            0 | 1 => Ok(hits.into_iter().next()),
            matches if self.strict => Err(IntervalError::DuplicateKey {
                start,
                stop,
                matches,
            }),
            _ => Ok(hits.into_iter().next()),
        }
    }
}

/// Builds interval lookups over a table.
///
/// The payload of each interval is the `value` field spec applied to its row,
/// which defaults to the whole row as a [`Value::Tuple`].
///
/// # Example
/// ```ignore
/// let lkp = LookupBuilder::new("start", "stop")
///     .value("value")
///     .proximity(1.0)
///     .lookup(&table)?;
/// ```
#[derive(Clone, Debug)]
pub struct LookupBuilder {
    pub(crate) start: Field,
    pub(crate) stop: Field,
    pub(crate) value: FieldSpec,
    pub(crate) proximity: f64,
    pub(crate) strict: bool,
}

/// Field positions resolved for one build.
pub(crate) struct Resolved {
    pub(crate) start: CoordGetter,
    pub(crate) stop: CoordGetter,
    pub(crate) value: FieldGetter,
}

impl LookupBuilder {
    #[must_use]
    pub fn new(start: impl Into<Field>, stop: impl Into<Field>) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
            value: FieldSpec::All,
            proximity: 0.0,
            strict: true,
        }
    }

    /// Field(s) to store as the payload instead of the whole row.
    #[must_use]
    pub fn value(mut self, value: impl Into<FieldSpec>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn proximity(mut self, proximity: f64) -> Self {
        self.proximity = proximity;
        self
    }

    /// Duplicate policy for the one-result lookups. Defaults to `true`.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Check options and resolve fields before any row is read.
    pub(crate) fn resolve(&self, header: &[String]) -> Result<Resolved> {
        check_proximity(self.proximity)?;
        Ok(Resolved {
            start: CoordGetter::resolve(&self.start, header)?,
            stop: CoordGetter::resolve(&self.stop, header)?,
            value: self.value.resolve(header)?,
        })
    }

    /// Lookup returning every matching payload.
    pub fn lookup<T: Table + ?Sized>(&self, table: &T) -> Result<IntervalLookup<Value>> {
        let fields = self.resolve(table.header())?;
        let tree = build_tree(table, &fields.start, &fields.stop, |row| {
            Some(fields.value.get(row))
        })?;
        Ok(IntervalLookup::with_proximity(tree, self.proximity))
    }

    /// Lookup returning at most one payload per query.
    pub fn lookup_one<T: Table + ?Sized>(&self, table: &T) -> Result<IntervalLookupOne<Value>> {
        Ok(IntervalLookupOne::new(self.lookup(table)?, self.strict))
    }

    /// Lookup whose payloads are whole rows as [`Record`]s.
    ///
    /// Rows too short to hold the start or stop field are skipped.
    pub fn record_lookup<T: Table + ?Sized>(&self, table: &T) -> Result<IntervalLookup<Record>> {
        let header = table.header();
        let fields = self.resolve(header)?;
        let needed = fields.start.index().max(fields.stop.index());
        let tree = build_tree(table, &fields.start, &fields.stop, |row| {
            (row.len() > needed).then(|| to_record(header, row))
        })?;
        Ok(IntervalLookup::with_proximity(tree, self.proximity))
    }

    /// One-result variant of [`LookupBuilder::record_lookup`].
    pub fn record_lookup_one<T: Table + ?Sized>(
        &self,
        table: &T,
    ) -> Result<IntervalLookupOne<Record>> {
        Ok(IntervalLookupOne::new(
            self.record_lookup(table)?,
            self.strict,
        ))
    }
}

/// Shorthand for `LookupBuilder::new(start, stop).lookup(table)`.
pub fn interval_lookup<T: Table + ?Sized>(
    table: &T,
    start: impl Into<Field>,
    stop: impl Into<Field>,
) -> Result<IntervalLookup<Value>> {
    LookupBuilder::new(start, stop).lookup(table)
}

pub(crate) fn check_proximity(proximity: f64) -> Result<()> {
    if proximity >= 0.0 && proximity.is_finite() {
        Ok(())
    } else {
        Err(IntervalError::InvalidProximity(proximity))
    }
}

pub(crate) fn to_record(header: &[String], row: &[Value]) -> Record {
    header
        .iter()
        .zip(row)
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

/// Index one full pass of `table`. Rows for which `payload` returns `None` are
/// skipped without reading their bounds.
pub(crate) fn build_tree<T, V, F>(
    table: &T,
    start: &CoordGetter,
    stop: &CoordGetter,
    mut payload: F,
) -> Result<IntervalTree<V>>
where
    T: Table + ?Sized,
    F: FnMut(&[Value]) -> Option<V>,
{
    let mut builder = IntervalTree::builder();
    for row in table.rows() {
        let row = row?;
        let Some(value) = payload(&row) else {
            continue;
        };
        builder.insert(start.coord(&row)?, stop.coord(&row)?, value);
    }
    debug!("built interval tree with {} entries", builder.len());
    Ok(builder.build())
}
