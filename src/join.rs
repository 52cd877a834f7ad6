//! Interval joins between two tables.
//!
//! Every join operator has the same shape. Fields are resolved against both
//! headers when the operator is constructed, so a missing field fails before
//! any row is read. Each pass over the output then indexes the right table in
//! full (one tree, or one tree per facet key) and streams the left table,
//! probing the index once per left row.
//!
//! The join operators are themselves [`Table`]s, so they compose with each
//! other and with anything else that consumes a table.
//!
//! | kind | output per left row |
//! |---|---|
//! | [`JoinKind::Inner`] | one row per match: left fields then right fields |
//! | [`JoinKind::Left`] | as inner, or one row padded with `missing` if nothing matched |
//! | [`JoinKind::Anti`] | the left row itself, only if nothing matched |
//! | [`JoinKind::Values`] | the left row plus one [`Value::List`] of projected matches |
//! | [`JoinKind::Subtract`] | one copy of the left row per uncovered remainder span |
//!
//! Matches are always produced in the right table's row order.

use std::iter;
use std::ops::Range;

use log::debug;

use crate::collapse::subtract;
use crate::facet::{FacetedLookup, build_faceted};
use crate::fields::{CoordGetter, Field, FieldGetter, FieldSpec};
use crate::interval_tree::Coord;
use crate::lookup::{IntervalLookup, build_tree, check_proximity};
use crate::table::{Rows, Table};
use crate::{Header, IntervalError, Result, Row, Value};

/// Field names and settings for a two-table interval operation.
#[derive(Clone, Debug)]
pub struct JoinOptions {
    lstart: Field,
    lstop: Field,
    rstart: Field,
    rstop: Field,
    lfacet: Option<FieldSpec>,
    rfacet: Option<FieldSpec>,
    proximity: f64,
    missing: Value,
    lprefix: Option<String>,
    rprefix: Option<String>,
}

impl JoinOptions {
    #[must_use]
    pub fn new(
        lstart: impl Into<Field>,
        lstop: impl Into<Field>,
        rstart: impl Into<Field>,
        rstop: impl Into<Field>,
    ) -> Self {
        Self {
            lstart: lstart.into(),
            lstop: lstop.into(),
            rstart: rstart.into(),
            rstop: rstop.into(),
            lfacet: None,
            rfacet: None,
            proximity: 0.0,
            missing: Value::Null,
            lprefix: None,
            rprefix: None,
        }
    }

    /// Facet the left table. A right facet must be given as well.
    #[must_use]
    pub fn left_facet(mut self, facet: impl Into<FieldSpec>) -> Self {
        self.lfacet = Some(facet.into());
        self
    }

    /// Facet the right table. A left facet must be given as well.
    #[must_use]
    pub fn right_facet(mut self, facet: impl Into<FieldSpec>) -> Self {
        self.rfacet = Some(facet.into());
        self
    }

    /// Only match rows whose left and right facet keys are equal.
    #[must_use]
    pub fn facets(self, left: impl Into<FieldSpec>, right: impl Into<FieldSpec>) -> Self {
        self.left_facet(left).right_facet(right)
    }

    #[must_use]
    pub fn proximity(mut self, proximity: f64) -> Self {
        self.proximity = proximity;
        self
    }

    /// Padding for the right fields of unmatched rows in a left join.
    #[must_use]
    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = missing.into();
        self
    }

    /// Prefixes for the left and right output field names of inner and left
    /// joins.
    #[must_use]
    pub fn prefixes(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.lprefix = Some(left.into());
        self.rprefix = Some(right.into());
        self
    }
}

/// The emission policy of an [`IntervalJoin`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Anti,
    /// Append the listed projections of all matches as one field.
    Values(FieldSpec),
    /// Replace the left interval by what the matches leave uncovered.
    Subtract,
}

/// Per-row emission, with everything resolved.
#[derive(Debug)]
enum Emit {
    Inner,
    Left,
    Anti,
    Values(FieldGetter),
    Subtract,
}

/// The right-table index built for one pass.
enum RightIndex {
    Plain(IntervalLookup<Row>),
    Faceted(FacetedLookup<IntervalLookup<Row>>),
}

impl RightIndex {
    fn find(
        &self,
        facet: Option<&Value>,
        start: Coord,
        stop: Coord,
    ) -> Vec<(&Range<Coord>, &Row)> {
        match (self, facet) {
            (RightIndex::Plain(lookup), _) => lookup.find_entries(start, stop),
            (RightIndex::Faceted(lookup), Some(key)) => lookup.find_entries(key, start, stop),
            (RightIndex::Faceted(_), None) => Vec::new(),
        }
    }
}

/// A lazily evaluated interval join of two tables.
#[derive(Debug)]
pub struct IntervalJoin<L, R> {
    left: L,
    right: R,
    emit: Emit,
    lstart: CoordGetter,
    lstop: CoordGetter,
    rstart: CoordGetter,
    rstop: CoordGetter,
    facets: Option<(FieldGetter, FieldGetter)>,
    proximity: f64,
    missing: Value,
    header: Header,
}

impl<L: Table, R: Table> IntervalJoin<L, R> {
    /// Resolve all fields of `options` against both tables.
    ///
    /// Fails without reading any row if a field is missing, if only one side
    /// is faceted, if the facets select different numbers of fields, or if the
    /// proximity is negative.
    pub fn new(left: L, right: R, kind: JoinKind, options: &JoinOptions) -> Result<Self> {
        check_proximity(options.proximity)?;

        let facets = match (&options.lfacet, &options.rfacet) {
            (None, None) => None,
            (Some(_), None) => return Err(IntervalError::FacetMismatch { given: "left" }),
            (None, Some(_)) => return Err(IntervalError::FacetMismatch { given: "right" }),
            (Some(lfacet), Some(rfacet)) => Some((lfacet, rfacet)),
        };

        let lheader = left.header();
        let rheader = right.header();
        let lstart = CoordGetter::resolve(&options.lstart, lheader)?;
        let lstop = CoordGetter::resolve(&options.lstop, lheader)?;
        let rstart = CoordGetter::resolve(&options.rstart, rheader)?;
        let rstop = CoordGetter::resolve(&options.rstop, rheader)?;

        let facets = match facets {
            Some((lfacet, rfacet)) => {
                let (lfacet, rfacet) = (lfacet.resolve(lheader)?, rfacet.resolve(rheader)?);
                if lfacet.arity() != rfacet.arity() {
                    return Err(IntervalError::FacetArity {
                        left: lfacet.arity(),
                        right: rfacet.arity(),
                    });
                }
                Some((lfacet, rfacet))
            }
            None => None,
        };

        let emit = match kind {
            JoinKind::Inner => Emit::Inner,
            JoinKind::Left => Emit::Left,
            JoinKind::Anti => Emit::Anti,
            JoinKind::Values(spec) => Emit::Values(spec.resolve(rheader)?),
            JoinKind::Subtract => Emit::Subtract,
        };

        let header = match &emit {
            Emit::Inner | Emit::Left => prefixed(lheader, options.lprefix.as_deref())
                .chain(prefixed(rheader, options.rprefix.as_deref()))
                .collect(),
            Emit::Anti | Emit::Subtract => lheader.to_vec(),
            Emit::Values(getter) => lheader
                .iter()
                .cloned()
                .chain(iter::once(getter.name().to_string()))
                .collect(),
        };

        Ok(Self {
            left,
            right,
            emit,
            lstart,
            lstop,
            rstart,
            rstop,
            facets,
            proximity: options.proximity,
            missing: options.missing.clone(),
            header,
        })
    }

    fn build_index(&self) -> Result<RightIndex> {
        let index = match &self.facets {
            None => {
                let tree = build_tree(&self.right, &self.rstart, &self.rstop, |row| {
                    Some(row.to_vec())
                })?;
                RightIndex::Plain(IntervalLookup::with_proximity(tree, self.proximity))
            }
            Some((_, rfacet)) => RightIndex::Faceted(build_faceted(
                &self.right,
                rfacet,
                &self.rstart,
                &self.rstop,
                self.proximity,
                |row| row.to_vec(),
            )?),
        };
        debug!("{:?} join: right table indexed", self.emit);
        Ok(index)
    }

    /// The output rows for one left row.
    fn probe(&self, index: &RightIndex, mut row: Row) -> Result<Vec<Row>> {
        let (start, stop) = (self.lstart.coord(&row)?, self.lstop.coord(&row)?);
        let facet = self.facets.as_ref().map(|(lfacet, _)| lfacet.get(&row));
        let hits = index.find(facet.as_ref(), start, stop);

        let out = match &self.emit {
            Emit::Inner => hits.iter().map(|(_, right)| concat(&row, right)).collect(),
            Emit::Left if hits.is_empty() => {
                let width = self.right.header().len();
                row.extend(iter::repeat_n(self.missing.clone(), width));
                vec![row]
            }
            Emit::Left => hits.iter().map(|(_, right)| concat(&row, right)).collect(),
            Emit::Anti if hits.is_empty() => vec![row],
            Emit::Anti => Vec::new(),
            Emit::Values(getter) => {
                let values = hits.iter().map(|(_, right)| getter.get(right)).collect();
                row.push(Value::List(values));
                vec![row]
            }
            Emit::Subtract => {
                let obstacles = hits.iter().map(|(range, _)| (range.start, range.end));
                subtract(start, stop, obstacles)
                    .into_iter()
                    .map(|(lo, hi)| self.with_bounds(&row, lo, hi))
                    .collect()
            }
        };
        Ok(out)
    }

    /// A copy of `row` with its interval replaced by `[start, stop)`.
    fn with_bounds(&self, row: &[Value], start: Coord, stop: Coord) -> Row {
        let mut row = row.to_vec();
        for (getter, coord) in [(&self.lstart, start), (&self.lstop, stop)] {
            if let Some(cell) = row.get_mut(getter.index()) {
                *cell = coord.to_value_like(cell);
            }
        }
        row
    }
}

impl<L: Table, R: Table> Table for IntervalJoin<L, R> {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn rows(&self) -> Rows<'_> {
        let index = match self.build_index() {
            Ok(index) => index,
            Err(err) => return Box::new(iter::once(Err(err))),
        };

        Box::new(self.left.rows().flat_map(move |row| {
            match row.and_then(|row| self.probe(&index, row)) {
                Ok(rows) => rows.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(err) => vec![Err(err)],
            }
        }))
    }
}

fn prefixed<'a>(
    header: &'a [String],
    prefix: Option<&'a str>,
) -> impl Iterator<Item = String> + 'a {
    header.iter().map(move |field| match prefix {
        Some(prefix) => format!("{prefix}{field}"),
        None => field.clone(),
    })
}

fn concat(left: &[Value], right: &[Value]) -> Row {
    let mut row = Vec::with_capacity(left.len() + right.len());
    row.extend_from_slice(left);
    row.extend_from_slice(right);
    row
}

/// Inner interval join: one output row per overlapping pair.
pub fn interval_join<L: Table, R: Table>(
    left: L,
    right: R,
    options: &JoinOptions,
) -> Result<IntervalJoin<L, R>> {
    IntervalJoin::new(left, right, JoinKind::Inner, options)
}

/// Left interval join: unmatched left rows are kept, padded with
/// the `missing` value.
pub fn interval_left_join<L: Table, R: Table>(
    left: L,
    right: R,
    options: &JoinOptions,
) -> Result<IntervalJoin<L, R>> {
    IntervalJoin::new(left, right, JoinKind::Left, options)
}

/// Left rows that overlap no right row.
pub fn interval_anti_join<L: Table, R: Table>(
    left: L,
    right: R,
    options: &JoinOptions,
) -> Result<IntervalJoin<L, R>> {
    IntervalJoin::new(left, right, JoinKind::Anti, options)
}

/// Left rows extended with the list of `value` projections of their matches.
pub fn interval_join_values<L: Table, R: Table>(
    left: L,
    right: R,
    value: impl Into<FieldSpec>,
    options: &JoinOptions,
) -> Result<IntervalJoin<L, R>> {
    IntervalJoin::new(left, right, JoinKind::Values(value.into()), options)
}

/// Left rows with the intervals of overlapping right rows cut out.
pub fn interval_subtract<L: Table, R: Table>(
    left: L,
    right: R,
    options: &JoinOptions,
) -> Result<IntervalJoin<L, R>> {
    IntervalJoin::new(left, right, JoinKind::Subtract, options)
}
