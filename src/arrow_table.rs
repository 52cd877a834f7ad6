//! Arrow record batches as a [`Table`].
//!
//! Column types are checked once, when the table is created. Rows are then
//! decoded lazily, one batch at a time, so lookups and joins can index Arrow
//! data without copying it into a [`crate::MemTable`] first.
//!
//! Supported columns: `Boolean`, signed and unsigned integers, `Float32`,
//! `Float64`, `Utf8`, `LargeUtf8` and `Int32`-keyed dictionaries of any of
//! these. Nulls read as [`Value::Null`].

use arrow::array::{
    Array, RecordBatch, as_boolean_array, as_dictionary_array, as_largestring_array,
    as_primitive_array, as_string_array,
};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, SchemaRef,
    UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};

use crate::table::{Rows, Table};
use crate::{Header, IntervalError, Result, Row, Value};

/// A table over a sequence of record batches sharing one schema.
#[derive(Clone, Debug)]
pub struct RecordBatchTable {
    schema: SchemaRef,
    header: Header,
    batches: Vec<RecordBatch>,
}

impl RecordBatchTable {
    /// Fails if a batch's fields differ from `schema`, or if a column has a
    /// type that cannot be read as [`Value`]s.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        for field in schema.fields() {
            if !is_supported(field.data_type()) {
                return Err(IntervalError::Arrow(format!(
                    "column {:?} has unsupported type {}",
                    field.name(),
                    field.data_type()
                )));
            }
        }

        if let Some(batch) = batches
            .iter()
            .find(|batch| batch.schema().fields() != schema.fields())
        {
            return Err(IntervalError::Arrow(format!(
                "batch schema {:?} does not match table schema {:?}",
                batch.schema().fields(),
                schema.fields()
            )));
        }

        let header = schema.fields().iter().map(|f| f.name().clone()).collect();
        Ok(Self {
            schema,
            header,
            batches,
        })
    }

    /// A table over a single batch.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        Self::try_new(batch.schema(), vec![batch])
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

impl Table for RecordBatchTable {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(self.batches.iter().flat_map(|batch| {
            (0..batch.num_rows()).map(move |idx| {
                batch
                    .columns()
                    .iter()
                    .map(|column| value_at(column.as_ref(), idx))
                    .collect::<Result<Row>>()
            })
        }))
    }
}

fn is_supported(data_type: &DataType) -> bool {
    match data_type {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64
        | DataType::Utf8
        | DataType::LargeUtf8 => true,
        DataType::Dictionary(key, values) => {
            **key == DataType::Int32
                && !matches!(**values, DataType::Dictionary(_, _))
                && is_supported(values)
        }
        _ => false,
    }
}

/// Read one cell of `array` as a [`Value`].
fn value_at(array: &dyn Array, idx: usize) -> Result<Value> {
    if array.is_null(idx) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Boolean => Value::Boolean(as_boolean_array(array).value(idx)),
        DataType::Int8 => Value::Int(as_primitive_array::<Int8Type>(array).value(idx).into()),
        DataType::Int16 => Value::Int(as_primitive_array::<Int16Type>(array).value(idx).into()),
        DataType::Int32 => Value::Int(as_primitive_array::<Int32Type>(array).value(idx).into()),
        DataType::Int64 => Value::Int(as_primitive_array::<Int64Type>(array).value(idx)),
        DataType::UInt8 => Value::Int(as_primitive_array::<UInt8Type>(array).value(idx).into()),
        DataType::UInt16 => Value::Int(as_primitive_array::<UInt16Type>(array).value(idx).into()),
        DataType::UInt32 => Value::Int(as_primitive_array::<UInt32Type>(array).value(idx).into()),
        DataType::UInt64 => Value::UInt(as_primitive_array::<UInt64Type>(array).value(idx)),
        DataType::Float32 => {
            Value::Float(as_primitive_array::<Float32Type>(array).value(idx).into())
        }
        DataType::Float64 => Value::Float(as_primitive_array::<Float64Type>(array).value(idx)),
        DataType::Utf8 => Value::from(as_string_array(array).value(idx)),
        DataType::LargeUtf8 => Value::from(as_largestring_array(array).value(idx)),
        DataType::Dictionary(key, _) if **key == DataType::Int32 => {
            let dict = as_dictionary_array::<Int32Type>(array);
            let key = usize::try_from(dict.keys().value(idx)).map_err(|_| {
                IntervalError::Arrow(format!("negative dictionary key at row {idx}"))
            })?;
            return value_at(dict.values().as_ref(), key);
        }
        other => {
            return Err(IntervalError::Arrow(format!(
                "cannot read values of type {other}"
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{JoinOptions, interval_join};
    use crate::lookup::LookupBuilder;
    use crate::table::{MemTable, collect_rows};
    use crate::row;
    use arrow::array::{ArrayRef, DictionaryArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field as ArrowField, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            ArrowField::new(
                "type",
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                false,
            ),
            ArrowField::new("start", DataType::Int64, false),
            ArrowField::new("stop", DataType::Int64, false),
            ArrowField::new("value", DataType::Utf8, true),
        ]));
        let types: DictionaryArray<Int32Type> = ["apple", "apple", "orange"].into_iter().collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(types) as ArrayRef,
                Arc::new(Int64Array::from(vec![1, 3, 4])),
                Arc::new(Int64Array::from(vec![4, 7, 9])),
                Arc::new(StringArray::from(vec![Some("foo"), None, Some("baz")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rows_from_record_batch() {
        let table = RecordBatchTable::from_batch(batch()).unwrap();

        assert_eq!(table.header(), ["type", "start", "stop", "value"]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            collect_rows(&table).unwrap(),
            vec![
                row!["apple", 1, 4, "foo"],
                row!["apple", 3, 7, None::<&str>],
                row!["orange", 4, 9, "baz"],
            ]
        );
    }

    #[test]
    fn test_several_batches() {
        let first = batch();
        let table = RecordBatchTable::try_new(first.schema(), vec![first.clone(), first]).unwrap();
        assert_eq!(collect_rows(&table).unwrap().len(), 6);
    }

    #[test]
    fn test_faceted_lookup_over_arrow() {
        let table = RecordBatchTable::from_batch(batch()).unwrap();
        let lkp = LookupBuilder::new("start", "stop")
            .value("value")
            .facet_lookup(&table, "type")
            .unwrap();

        assert_eq!(lkp.find_point(&Value::from("apple"), 5), vec![&Value::Null]);
        assert_eq!(lkp.find_point(&Value::from("orange"), 5), vec![&Value::from("baz")]);
    }

    #[test]
    fn test_join_arrow_with_memory_table() {
        let schema = Arc::new(Schema::new(vec![
            ArrowField::new("begin", DataType::Float64, false),
            ArrowField::new("end", DataType::Float64, false),
        ]));
        let left = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![1.5, 8.5])) as ArrayRef,
                Arc::new(Float64Array::from(vec![2.5, 10.0])),
            ],
        )
        .unwrap();
        let left = RecordBatchTable::from_batch(left).unwrap();
        let right = MemTable::new(["start", "stop"], vec![row![1, 4], row![9, 12]]);

        let join = interval_join(&left, &right, &JoinOptions::new("begin", "end", "start", "stop"))
            .unwrap();
        assert_eq!(
            collect_rows(&join).unwrap(),
            vec![row![1.5, 2.5, 1, 4], row![8.5, 10.0, 9, 12]]
        );
    }

    #[test]
    fn test_unsupported_column_type() {
        let schema = Arc::new(Schema::new(vec![ArrowField::new(
            "day",
            DataType::Date32,
            false,
        )]));
        let err = RecordBatchTable::try_new(schema, vec![]).unwrap_err();
        assert!(matches!(err, IntervalError::Arrow(_)));
    }

    #[test]
    fn test_mismatched_batch_schema() {
        let other = Arc::new(Schema::new(vec![ArrowField::new(
            "start",
            DataType::Int64,
            false,
        )]));
        let err = RecordBatchTable::try_new(other, vec![batch()]).unwrap_err();
        assert!(matches!(err, IntervalError::Arrow(_)));
    }
}
