//! Record-file loading for the CLI.
//!
//! Inputs are JSON arrays of record objects or CSV files. Both are carried
//! into the pipeline as loosely-typed records; numeric coercion (including
//! thousands separators) happens inside the ratio engine.

use fremantle::records_to_frame;
use polars::prelude::DataFrame;
use serde_json::{Map, Value};
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// Load a record file into a DataFrame.
///
/// `.json` files must hold an array of objects; anything else is read as
/// CSV with a header row. Empty CSV cells become null.
pub fn read_records(path: &Path) -> Result<DataFrame, Box<dyn Error>> {
    let records = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => read_json(path)?,
        _ => read_csv(path)?,
    };
    Ok(records_to_frame(&records)?)
}

fn read_json(path: &Path) -> Result<Vec<Map<String, Value>>, Box<dyn Error>> {
    let file = File::open(path)?;
    let records: Vec<Map<String, Value>> = serde_json::from_reader(file)?;
    Ok(records)
}

fn read_csv(path: &Path) -> Result<Vec<Map<String, Value>>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Map::with_capacity(headers.len());
        for (header, cell) in headers.iter().zip(row.iter()) {
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            };
            record.insert(header.to_string(), value);
        }
        records.push(record);
    }
    Ok(records)
}
