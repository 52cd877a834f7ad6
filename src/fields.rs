//! Field addressing: resolve field names or positions against a header.
//!
//! A [`FieldSpec`] is resolved once against a header into a [`FieldGetter`],
//! a plain list of positions, so per-row extraction never looks at names.

use std::fmt;

use smallvec::SmallVec;

use crate::interval_tree::Coord;
use crate::{IntervalError, Result, Value};

static NULL: Value = Value::Null;

/// A single field, by name or by position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name(String),
    Index(usize),
}

impl Field {
    /// Find this field's position in `header`.
    pub fn resolve(&self, header: &[String]) -> Result<usize> {
        let position = match self {
            Field::Name(name) => header.iter().position(|f| f == name),
            Field::Index(idx) => (*idx < header.len()).then_some(*idx),
        };
        position.ok_or_else(|| IntervalError::FieldNotFound {
            field: self.to_string(),
            available: header.to_vec(),
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name(name) => write!(f, "{name}"),
            Field::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::Name(name.to_string())
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::Name(name)
    }
}

impl From<usize> for Field {
    fn from(idx: usize) -> Self {
        Field::Index(idx)
    }
}

/// Which fields to extract from a row.
///
/// `Single` yields the bare value, `Compound` yields a [`Value::Tuple`] in the
/// given order, and `All` yields the whole row as a tuple. A selection that
/// resolves to exactly one field always yields the bare value, so
/// `Compound(vec!["type".into()])` and `Single("type".into())` extract equal keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldSpec {
    Single(Field),
    Compound(Vec<Field>),
    #[default]
    All,
}

impl FieldSpec {
    /// Resolve against a header.
    ///
    /// Fails with [`IntervalError::FieldNotFound`] for unknown fields and with
    /// [`IntervalError::InvalidFieldSpec`] when nothing would be selected.
    pub fn resolve(&self, header: &[String]) -> Result<FieldGetter> {
        let indices: SmallVec<[usize; 4]> = match self {
            FieldSpec::Single(field) => smallvec::smallvec![field.resolve(header)?],
            FieldSpec::Compound(fields) => fields
                .iter()
                .map(|f| f.resolve(header))
                .collect::<Result<_>>()?,
            FieldSpec::All => (0..header.len()).collect(),
        };

        if indices.is_empty() {
            return Err(IntervalError::InvalidFieldSpec(format!(
                "{self:?} selects no fields from header {header:?}"
            )));
        }

        let name = indices
            .iter()
            .map(|&i| header[i].as_str())
            .collect::<Vec<_>>()
            .join("_");

        Ok(FieldGetter { indices, name })
    }
}

impl From<Field> for FieldSpec {
    fn from(field: Field) -> Self {
        FieldSpec::Single(field)
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        FieldSpec::Single(name.into())
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        FieldSpec::Single(name.into())
    }
}

impl From<usize> for FieldSpec {
    fn from(idx: usize) -> Self {
        FieldSpec::Single(idx.into())
    }
}

impl From<Vec<Field>> for FieldSpec {
    fn from(fields: Vec<Field>) -> Self {
        FieldSpec::Compound(fields)
    }
}

impl From<&[&str]> for FieldSpec {
    fn from(names: &[&str]) -> Self {
        FieldSpec::Compound(names.iter().map(|&n| n.into()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldSpec {
    fn from(names: [&str; N]) -> Self {
        FieldSpec::Compound(names.into_iter().map(Into::into).collect())
    }
}

impl From<(&str, &str)> for FieldSpec {
    fn from((a, b): (&str, &str)) -> Self {
        FieldSpec::Compound(vec![a.into(), b.into()])
    }
}

/// A resolved [`FieldSpec`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldGetter {
    indices: SmallVec<[usize; 4]>,
    name: String,
}

impl FieldGetter {
    /// Extract the selected value(s) from a row.
    ///
    /// Positions past the end of a short row read as [`Value::Null`].
    #[must_use]
    pub fn get(&self, row: &[Value]) -> Value {
        match self.indices.as_slice() {
            [idx] => cell(row, *idx).clone(),
            indices => Value::Tuple(indices.iter().map(|&i| cell(row, i).clone()).collect()),
        }
    }

    /// Positions of the selected fields.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of selected fields.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.indices.len()
    }

    /// Output field name: the selected field names joined by `_`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A resolved interval bound field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordGetter {
    index: usize,
    name: String,
}

impl CoordGetter {
    pub fn resolve(field: &Field, header: &[String]) -> Result<Self> {
        let index = field.resolve(header)?;
        Ok(Self {
            index,
            name: header[index].clone(),
        })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Read the bound from a row.
    pub fn coord(&self, row: &[Value]) -> Result<Coord> {
        let value = cell(row, self.index);
        value
            .as_coord()
            .ok_or_else(|| IntervalError::NonNumericBound {
                field: self.name.clone(),
                value: value.clone(),
            })
    }
}

fn cell(row: &[Value], idx: usize) -> &Value {
    row.get(idx).unwrap_or(&NULL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn header() -> Vec<String> {
        ["type", "variety", "start", "stop"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_single_field() {
        let getter = FieldSpec::from("variety").resolve(&header()).unwrap();
        assert_eq!(getter.indices(), [1]);
        assert_eq!(getter.get(&row!["apple", "cox", 1, 4]), Value::from("cox"));
        assert_eq!(getter.name(), "variety");
    }

    #[test]
    fn test_compound_field_keeps_spec_order() {
        let getter = FieldSpec::from(["variety", "type"]).resolve(&header()).unwrap();
        assert_eq!(getter.arity(), 2);
        assert_eq!(
            getter.get(&row!["apple", "cox", 1, 4]),
            Value::Tuple(row!["cox", "apple"])
        );
        assert_eq!(getter.name(), "variety_type");
    }

    #[test]
    fn test_all_fields_is_whole_row() {
        let getter = FieldSpec::All.resolve(&header()).unwrap();
        assert_eq!(
            getter.get(&row!["apple", "cox", 1, 4]),
            Value::Tuple(row!["apple", "cox", 1, 4])
        );
    }

    #[test]
    fn test_one_field_compound_is_bare() {
        let single = FieldSpec::from("type").resolve(&header()).unwrap();
        let compound = FieldSpec::from(["type"]).resolve(&header()).unwrap();
        let row = row!["apple", "cox", 1, 4];
        assert_eq!(single.get(&row), compound.get(&row));
        assert_eq!(compound.get(&row), Value::from("apple"));
    }

    #[test]
    fn test_index_field() {
        let getter = FieldSpec::from(2usize).resolve(&header()).unwrap();
        assert_eq!(getter.get(&row!["apple", "cox", 1, 4]), Value::from(1));

        let err = FieldSpec::from(9usize).resolve(&header()).unwrap_err();
        assert!(matches!(err, IntervalError::FieldNotFound { field, .. } if field == "#9"));
    }

    #[test]
    fn test_unknown_field() {
        let err = FieldSpec::from(["type", "colour"])
            .resolve(&header())
            .unwrap_err();
        assert!(matches!(err, IntervalError::FieldNotFound { field, .. } if field == "colour"));
    }

    #[test]
    fn test_empty_compound_is_invalid() {
        let err = FieldSpec::Compound(vec![]).resolve(&header()).unwrap_err();
        assert!(matches!(err, IntervalError::InvalidFieldSpec(_)));

        let err = FieldSpec::All.resolve(&[]).unwrap_err();
        assert!(matches!(err, IntervalError::InvalidFieldSpec(_)));
    }

    #[test]
    fn test_short_row_reads_null() {
        let getter = FieldSpec::from("stop").resolve(&header()).unwrap();
        assert_eq!(getter.get(&row!["apple"]), Value::Null);
    }

    #[test]
    fn test_coord_getter() {
        let start = CoordGetter::resolve(&"start".into(), &header()).unwrap();
        assert_eq!(start.coord(&row!["apple", "cox", 1, 4]).unwrap(), 1.into());

        let err = start.coord(&row!["apple", "cox", "one", 4]).unwrap_err();
        assert!(matches!(
            err,
            IntervalError::NonNumericBound { field, value }
                if field == "start" && value == Value::from("one")
        ));
    }
}
