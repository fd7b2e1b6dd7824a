//! DataFrame construction from loosely-typed records.
//!
//! Records arrive as JSON objects with arbitrary keys and mixed value types
//! (numbers, numeric strings with thousands separators, nulls). Every value
//! is carried as a string column here; the ratio engine applies the numeric
//! coercion so that an unparseable cell becomes null, never zero.

use crate::error::Result;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Build a DataFrame from a slice of JSON record objects.
///
/// Columns are the union of all record keys, in first-seen order. A key
/// absent from a record yields a null cell.
pub fn records_to_frame(records: &[Map<String, Value>]) -> Result<DataFrame> {
    let mut order: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                order.push(key.as_str());
            }
        }
    }

    let columns: Vec<Column> = order
        .iter()
        .map(|key| {
            let values: Vec<Option<String>> = records
                .iter()
                .map(|record| record.get(*key).and_then(scalar_to_string))
                .collect();
            Series::new((*key).into(), values).into()
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Expression coercing a raw field to Float64.
///
/// Thousands separators and interior spaces are stripped first; anything
/// still unparseable becomes null.
pub(crate) fn numeric_cleaned(field: &str) -> Expr {
    col(field)
        .cast(DataType::String)
        .str()
        .replace_all(lit(","), lit(""), true)
        .str()
        .replace_all(lit(" "), lit(""), true)
        .cast(DataType::Float64)
        .alias(field)
}

/// Whether a dtype takes part in metric aggregation and variation.
pub(crate) const fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_records_to_frame_union_of_keys() {
        let records = vec![
            record(json!({"company": "ABC", "revenue": 1200})),
            record(json!({"company": "XYZ", "equity": "2,000,000"})),
        ];
        let df = records_to_frame(&records).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["company", "revenue", "equity"]);
        assert_eq!(df.height(), 2);

        let revenue = df.column("revenue").unwrap().str().unwrap();
        assert_eq!(revenue.get(0), Some("1200"));
        assert_eq!(revenue.get(1), None);
    }

    #[test]
    fn test_numeric_cleaned_strips_separators() {
        let df = df!["revenue" => ["1,200,000", " 950 000 ", "n/a"]].unwrap();
        let out = df
            .lazy()
            .with_columns([numeric_cleaned("revenue")])
            .collect()
            .unwrap();
        let revenue = out.column("revenue").unwrap().f64().unwrap();
        assert_eq!(revenue.get(0), Some(1_200_000.0));
        assert_eq!(revenue.get(1), Some(950_000.0));
        assert_eq!(revenue.get(2), None);
    }

    #[test]
    fn test_empty_records_yield_empty_frame() {
        let df = records_to_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 0);
    }
}
