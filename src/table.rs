//! The table abstraction consumed and produced by every operator.
//!
//! A table is a header (ordered, unique field names) plus a sequence of data
//! rows positionally aligned to it. Each call to [`Table::rows`] starts a fresh
//! pass over the source, so an operator may read the same table more than once
//! (one pass to build an index, another to stream the probe side).

use crate::{Header, Result, Row};

/// A boxed, fallible iterator over the data rows of a table.
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// A header-plus-rows source.
pub trait Table {
    /// The field names, in row order.
    fn header(&self) -> &[String];

    /// A fresh pass over the data rows.
    fn rows(&self) -> Rows<'_>;
}

impl<T: Table + ?Sized> Table for &T {
    fn header(&self) -> &[String] {
        (**self).header()
    }

    fn rows(&self) -> Rows<'_> {
        (**self).rows()
    }
}

/// An in-memory table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemTable {
    header: Header,
    rows: Vec<Row>,
}

impl MemTable {
    /// Create a table from a header and its data rows.
    pub fn new<I, S>(header: I, rows: Vec<Row>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Materialize any table into memory.
    pub fn from_table<T: Table + ?Sized>(table: &T) -> Result<Self> {
        Ok(Self {
            header: table.header().to_vec(),
            rows: collect_rows(table)?,
        })
    }

    /// Number of data rows (the header is not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The data rows.
    #[must_use]
    pub fn data(&self) -> &[Row] {
        &self.rows
    }
}

impl Table for MemTable {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(self.rows.iter().cloned().map(Ok))
    }
}

/// Consume one pass of a table into a vector, stopping at the first error.
pub fn collect_rows<T: Table + ?Sized>(table: &T) -> Result<Vec<Row>> {
    table.rows().collect()
}
