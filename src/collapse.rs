//! Interval collapsing and subtraction.
//!
//! [`collapse`] merges a start-sorted stream of intervals in one sweep: an
//! interval starting at or before the running span's end extends it, a
//! strictly later one closes it. Adjacent intervals (`next.start == end`) are
//! therefore merged.
//!
//! [`subtract`] removes a set of obstacle intervals from one span and returns
//! the uncovered remainder, in order.

use std::iter::Fuse;

use log::debug;

use crate::fields::{CoordGetter, Field, FieldSpec};
use crate::interval_tree::Coord;
use crate::table::Table;
use crate::{Result, Value};

/// Lazy merge of start-sorted `(start, stop)` pairs. See [`collapse`].
#[derive(Debug, Clone)]
pub struct Collapse<I, K> {
    iter: Fuse<I>,
    current: Option<(K, K)>,
}

/// Merge overlapping or touching intervals of a stream sorted by start.
///
/// The input must be sorted by start; unsorted input is not detected and
/// yields spans that are merged only locally.
pub fn collapse<I, K>(intervals: I) -> Collapse<I::IntoIter, K>
where
    I: IntoIterator<Item = (K, K)>,
    K: PartialOrd,
{
    Collapse {
        iter: intervals.into_iter().fuse(),
        current: None,
    }
}

impl<I, K> Iterator for Collapse<I, K>
where
    I: Iterator<Item = (K, K)>,
    K: PartialOrd,
{
    type Item = (K, K);

    fn next(&mut self) -> Option<Self::Item> {
        for (start, stop) in self.iter.by_ref() {
            match &mut self.current {
                None => self.current = Some((start, stop)),
                Some((_, cur_stop)) if start <= *cur_stop => {
                    if stop > *cur_stop {
                        *cur_stop = stop;
                    }
                }
                Some(_) => return self.current.replace((start, stop)),
            }
        }
        self.current.take()
    }
}

/// The parts of `[start, stop)` not covered by any of `obstacles`.
///
/// Obstacles may overlap each other and arrive in any order. An obstacle
/// covering the whole span leaves nothing; a span no obstacle reaches comes
/// back unchanged. Zero-width obstacles remove nothing.
pub fn subtract<K, I>(start: K, stop: K, obstacles: I) -> Vec<(K, K)>
where
    K: PartialOrd + Copy,
    I: IntoIterator<Item = (K, K)>,
{
    let mut obstacles: Vec<(K, K)> = obstacles.into_iter().collect();
    obstacles.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut remainder = Vec::new();
    let mut cursor = start;
    let mut touched = false;

    for (lo, hi) in collapse(obstacles) {
        if !(lo < hi) || hi <= cursor {
            continue;
        }
        if lo >= stop {
            break;
        }
        touched = true;
        if lo > cursor {
            remainder.push((cursor, lo));
        }
        cursor = hi;
    }

    if !touched {
        return vec![(start, stop)];
    }
    if cursor < stop {
        remainder.push((cursor, stop));
    }
    remainder
}

/// One merged span from [`collapsed_intervals`] or
/// [`facet_collapsed_intervals`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollapsedInterval {
    /// The facet key, for faceted collapsing.
    pub facet: Option<Value>,
    pub start: Coord,
    pub stop: Coord,
}

/// Sort a table's intervals by start and collapse them.
///
/// The table is read and sorted up front; the merged spans are then produced
/// lazily.
pub fn collapsed_intervals<T: Table + ?Sized>(
    table: &T,
    start: impl Into<Field>,
    stop: impl Into<Field>,
) -> Result<impl Iterator<Item = CollapsedInterval>> {
    let header = table.header();
    let start = CoordGetter::resolve(&start.into(), header)?;
    let stop = CoordGetter::resolve(&stop.into(), header)?;

    let mut spans = Vec::new();
    for row in table.rows() {
        let row = row?;
        spans.push((start.coord(&row)?, stop.coord(&row)?));
    }
    spans.sort();
    debug!("collapsing {} intervals", spans.len());

    Ok(collapse(spans).map(|(start, stop)| CollapsedInterval {
        facet: None,
        start,
        stop,
    }))
}

/// Sort a table's intervals by facet then start, and collapse each facet
/// separately. Facets come out in sorted order.
pub fn facet_collapsed_intervals<T: Table + ?Sized>(
    table: &T,
    facet: impl Into<FieldSpec>,
    start: impl Into<Field>,
    stop: impl Into<Field>,
) -> Result<impl Iterator<Item = CollapsedInterval>> {
    let header = table.header();
    let start = CoordGetter::resolve(&start.into(), header)?;
    let stop = CoordGetter::resolve(&stop.into(), header)?;
    let facet = facet.into().resolve(header)?;

    let mut spans = Vec::new();
    for row in table.rows() {
        let row = row?;
        spans.push((facet.get(&row), start.coord(&row)?, stop.coord(&row)?));
    }
    spans.sort();
    debug!("collapsing {} intervals on {:?}", spans.len(), facet.name());

    // Keying both bounds by facet keeps spans of different facets apart.
    let keyed = spans
        .into_iter()
        .map(|(key, start, stop)| ((key.clone(), start), (key, stop)));
    Ok(collapse(keyed).map(|((key, start), (_, stop))| CollapsedInterval {
        facet: Some(key),
        start,
        stop,
    }))
}
