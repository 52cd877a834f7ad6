//! Faceted interval lookups: one independent lookup per facet key.
//!
//! A facet key is extracted from each row by a [`FieldSpec`]: a bare value for
//! a single field, a [`Value::Tuple`] for a compound one. Rows are grouped by
//! key in a single pass over the table, then each group's tree is frozen. The
//! resulting mapping is immutable and keeps facets in first-seen order.
//!
//! Querying a facet that never occurred is not an error: the plain lookups
//! return no matches and the one-result lookups return `None`.

use std::ops::Range;

use log::debug;

use crate::fields::{CoordGetter, FieldGetter, FieldSpec};
use crate::interval_tree::{Coord, IntervalTreeBuilder};
use crate::lookup::{IntervalLookup, IntervalLookupOne, LookupBuilder, Record, to_record};
use crate::table::Table;
use crate::{FastIndexMap, Result, Value};

/// A mapping from facet key to a single-key lookup.
#[derive(Debug)]
pub struct FacetedLookup<L> {
    lookups: FastIndexMap<Value, L>,
}

impl<L> FacetedLookup<L> {
    /// The lookup for `facet`, if any row carried that key.
    #[must_use]
    pub fn get(&self, facet: &Value) -> Option<&L> {
        self.lookups.get(facet)
    }

    #[must_use]
    pub fn contains_key(&self, facet: &Value) -> bool {
        self.lookups.contains_key(facet)
    }

    /// Number of distinct facet keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    /// Facet keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.lookups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &L)> {
        self.lookups.iter()
    }

    fn map<M>(self, mut f: impl FnMut(L) -> M) -> FacetedLookup<M> {
        FacetedLookup {
            lookups: self
                .lookups
                .into_iter()
                .map(|(facet, lookup)| (facet, f(lookup)))
                .collect(),
        }
    }
}

impl<V> FacetedLookup<IntervalLookup<V>> {
    /// Matches for `[start, stop)` under `facet`; empty for an unknown facet.
    #[must_use]
    pub fn find(&self, facet: &Value, start: impl Into<Coord>, stop: impl Into<Coord>) -> Vec<&V> {
        self.get(facet)
            .map(|lookup| lookup.find(start, stop))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn find_point(&self, facet: &Value, point: impl Into<Coord>) -> Vec<&V> {
        self.get(facet)
            .map(|lookup| lookup.find_point(point))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn find_entries(
        &self,
        facet: &Value,
        start: Coord,
        stop: Coord,
    ) -> Vec<(&Range<Coord>, &V)> {
        self.get(facet)
            .map(|lookup| lookup.find_entries(start, stop))
            .unwrap_or_default()
    }
}

impl<V> FacetedLookup<IntervalLookupOne<V>> {
    /// The single match for `[start, stop)` under `facet`, or `None`.
    pub fn find(
        &self,
        facet: &Value,
        start: impl Into<Coord>,
        stop: impl Into<Coord>,
    ) -> Result<Option<&V>> {
        match self.get(facet) {
            Some(lookup) => lookup.find(start, stop),
            None => Ok(None),
        }
    }

    pub fn find_point(&self, facet: &Value, point: impl Into<Coord>) -> Result<Option<&V>> {
        match self.get(facet) {
            Some(lookup) => lookup.find_point(point),
            None => Ok(None),
        }
    }
}

/// Group one pass of `table` into per-facet trees.
pub(crate) fn build_faceted<T, V, F>(
    table: &T,
    facet: &FieldGetter,
    start: &CoordGetter,
    stop: &CoordGetter,
    proximity: f64,
    mut payload: F,
) -> Result<FacetedLookup<IntervalLookup<V>>>
where
    T: Table + ?Sized,
    F: FnMut(&[Value]) -> V,
{
    let mut builders: FastIndexMap<Value, IntervalTreeBuilder<V>> = FastIndexMap::default();
    let mut entries = 0usize;

    for row in table.rows() {
        let row = row?;
        let (lo, hi) = (start.coord(&row)?, stop.coord(&row)?);
        builders
            .entry(facet.get(&row))
            .or_default()
            .insert(lo, hi, payload(&row));
        entries += 1;
    }

    debug!(
        "built faceted lookup on {:?}: {} facets, {} entries",
        facet.name(),
        builders.len(),
        entries
    );

    let lookups = builders
        .into_iter()
        .map(|(key, builder)| (key, IntervalLookup::with_proximity(builder.build(), proximity)))
        .collect();
    Ok(FacetedLookup { lookups })
}

impl LookupBuilder {
    /// Faceted lookup returning every matching payload.
    pub fn facet_lookup<T: Table + ?Sized>(
        &self,
        table: &T,
        facet: impl Into<FieldSpec>,
    ) -> Result<FacetedLookup<IntervalLookup<Value>>> {
        let header = table.header();
        let fields = self.resolve(header)?;
        let facet = facet.into().resolve(header)?;
        build_faceted(
            table,
            &facet,
            &fields.start,
            &fields.stop,
            self.proximity,
            |row| fields.value.get(row),
        )
    }

    /// Faceted lookup returning at most one payload per query.
    pub fn facet_lookup_one<T: Table + ?Sized>(
        &self,
        table: &T,
        facet: impl Into<FieldSpec>,
    ) -> Result<FacetedLookup<IntervalLookupOne<Value>>> {
        let strict = self.strict;
        Ok(self
            .facet_lookup(table, facet)?
            .map(|lookup| IntervalLookupOne::new(lookup, strict)))
    }

    /// Faceted lookup whose payloads are whole rows as [`Record`]s.
    pub fn facet_record_lookup<T: Table + ?Sized>(
        &self,
        table: &T,
        facet: impl Into<FieldSpec>,
    ) -> Result<FacetedLookup<IntervalLookup<Record>>> {
        let header = table.header();
        let fields = self.resolve(header)?;
        let facet = facet.into().resolve(header)?;
        build_faceted(
            table,
            &facet,
            &fields.start,
            &fields.stop,
            self.proximity,
            |row| to_record(header, row),
        )
    }

    pub fn facet_record_lookup_one<T: Table + ?Sized>(
        &self,
        table: &T,
        facet: impl Into<FieldSpec>,
    ) -> Result<FacetedLookup<IntervalLookupOne<Record>>> {
        let strict = self.strict;
        Ok(self
            .facet_record_lookup(table, facet)?
            .map(|lookup| IntervalLookupOne::new(lookup, strict)))
    }
}
