//! Export of ratio tables as CSV and JSON.
//!
//! CSV export emits the fixed reporting column order at full numeric
//! precision with empty cells for nulls. JSON export converts every row to an
//! object in which null and non-finite numerics become JSON null, keeping the
//! output machine-readable.

use polars::prelude::*;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Polars error.
    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Fixed reporting column order for exported views.
pub const REPORT_COLUMNS: [&str; 33] = [
    "company",
    "period",
    "year",
    "quarter",
    "month",
    "revenue",
    "operating_cash_flow",
    "total_assets",
    "total_liabilities",
    "equity",
    "current_assets",
    "current_liabilities",
    "long_term_liabilities",
    "inventory",
    "debt_to_equity",
    "debt_to_revenue",
    "current_ratio",
    "quick_ratio",
    "short_term_debt_ratio",
    "long_term_debt_ratio",
    "short_term_debt_to_equity",
    "short_term_debt_to_revenue",
    "long_term_debt_to_equity",
    "long_term_debt_to_revenue",
    "receivables_turnover",
    "payables_turnover",
    "cash_flow_margin",
    "equity_ratio",
    "liabilities_ratio",
    "roa",
    "roe",
    "altman_z_prime",
    "altman_z_interpretation",
];

/// The reporting columns the given table actually carries, in report order.
pub fn report_columns(df: &DataFrame) -> Vec<&'static str> {
    REPORT_COLUMNS
        .iter()
        .copied()
        .filter(|name| df.column(name).is_ok())
        .collect()
}

/// Render a ratio table in the given format.
pub fn export_to_string(df: &DataFrame, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => to_csv_string(df),
        ExportFormat::Json => Ok(serde_json::to_string(&to_json_records(df)?)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&to_json_records(df)?)?),
    }
}

/// Render the reporting columns of a table as CSV.
///
/// Only columns from [`REPORT_COLUMNS`] are emitted, in that order; null
/// cells are empty. Numeric values keep full precision.
pub fn to_csv_string(df: &DataFrame) -> Result<String, ExportError> {
    let columns = report_columns(df);

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&columns)?;
    for i in 0..df.height() {
        let mut record: Vec<String> = Vec::with_capacity(columns.len());
        for name in &columns {
            record.push(csv_cell(df.column(name)?.get(i)?));
        }
        wtr.write_record(&record)?;
    }

    let data = String::from_utf8(wtr.into_inner().map_err(|e| e.into_error())?)
        .expect("csv output is valid UTF-8");
    Ok(data)
}

/// Convert every row of a table to a JSON object.
///
/// All columns are included. Null cells and non-finite floats map to JSON
/// null.
pub fn to_json_records(df: &DataFrame) -> Result<Vec<Map<String, Value>>, ExportError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut record = Map::with_capacity(names.len());
        for name in &names {
            record.insert(name.clone(), json_value(df.column(name)?.get(i)?));
        }
        records.push(record);
    }
    Ok(records)
}

fn csv_cell(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Float64(v) if !v.is_finite() => String::new(),
        AnyValue::Float64(v) => v.to_string(),
        AnyValue::Float32(v) if !v.is_finite() => String::new(),
        AnyValue::Float32(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn json_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        // from_f64 is None for NaN and infinities, which must serialize null
        AnyValue::Float64(v) => serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number),
        AnyValue::Float32(v) => {
            serde_json::Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
        }
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        other => Value::String(other.to_string()),
    }
}
