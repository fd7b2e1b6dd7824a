//! Period aggregation of ratio-augmented records.
//!
//! Rows are grouped by (company, year) or (company, year, quarter) and a
//! fixed allow-list of metrics is averaged or summed. Identifying and
//! period-part columns are group keys, never aggregated values.

use crate::error::{AnalysisError, Result};
use crate::frame::is_numeric_dtype;
use crate::period::add_period_parts;
use crate::schema::COMPANY;
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Period granularity of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Granularity {
    /// One output row per (company, year, quarter).
    #[display("quarterly")]
    Quarterly,
    /// One output row per (company, year).
    #[display("yearly")]
    Yearly,
}

impl FromStr for Granularity {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "q" | "quarterly" => Ok(Self::Quarterly),
            "y" | "yearly" => Ok(Self::Yearly),
            other => Err(AnalysisError::InvalidArgument(format!(
                "granularity must be 'quarterly' or 'yearly', got '{other}'"
            ))),
        }
    }
}

/// How grouped metric values are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum AggMethod {
    /// Arithmetic mean, null cells skipped.
    #[display("mean")]
    Mean,
    /// Sum, null cells skipped.
    #[display("sum")]
    Sum,
}

impl FromStr for AggMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            other => Err(AnalysisError::InvalidArgument(format!(
                "method must be 'mean' or 'sum', got '{other}'"
            ))),
        }
    }
}

/// Metrics eligible for aggregation, in output order. Everything else in the
/// input (labels, period parts, interpretation strings) is either a group key
/// or dropped.
pub const AGGREGATED_METRICS: [&str; 27] = [
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
];

/// Aggregate ratio rows into a per-period series.
///
/// Period parts are derived first when the table does not carry them yet.
/// Rows whose granularity-defining part is null (quarter for quarterly, year
/// for yearly) are excluded. Output rows are sorted ascending by
/// (company, year[, quarter]).
pub fn aggregate_by_period(
    df: DataFrame,
    granularity: Granularity,
    method: AggMethod,
) -> Result<DataFrame> {
    let df = if df.column("year").is_err() {
        add_period_parts(df)?
    } else {
        df
    };

    let mut keys: Vec<Expr> = Vec::new();
    let mut key_names: Vec<PlSmallStr> = Vec::new();
    if df.column(COMPANY).is_ok() {
        keys.push(col(COMPANY));
        key_names.push(COMPANY.into());
    }
    keys.push(col("year"));
    key_names.push("year".into());

    let defining = match granularity {
        Granularity::Quarterly => {
            keys.push(col("quarter"));
            key_names.push("quarter".into());
            "quarter"
        }
        Granularity::Yearly => "year",
    };

    let aggs: Vec<Expr> = AGGREGATED_METRICS
        .iter()
        .filter(|metric| {
            df.column(metric)
                .map(|column| is_numeric_dtype(column.dtype()))
                .unwrap_or(false)
        })
        .map(|metric| match method {
            AggMethod::Mean => col(*metric).mean(),
            AggMethod::Sum => col(*metric).sum(),
        })
        .collect();

    let out = df
        .lazy()
        .filter(col(defining).is_not_null())
        .group_by(keys)
        .agg(aggs)
        .sort(key_names, SortMultipleOptions::default())
        .collect()?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quarterly_input() -> DataFrame {
        df![
            "company" => ["ABC", "ABC", "ABC", "XYZ"],
            "period" => ["2023-Q1", "2023-Q1", "2023-Q2", "2023-Q1"],
            "revenue" => [1000.0, 1200.0, 1300.0, 900.0],
            "roa" => [0.03, 0.05, 0.04, 0.02]
        ]
        .unwrap()
    }

    #[test]
    fn test_mean_aggregation_is_deterministic() {
        let out = aggregate_by_period(quarterly_input(), Granularity::Quarterly, AggMethod::Mean)
            .unwrap();
        assert_eq!(out.height(), 3);

        let company = out.column("company").unwrap().str().unwrap();
        let year = out.column("year").unwrap().i32().unwrap();
        let quarter = out.column("quarter").unwrap().i32().unwrap();
        let revenue = out.column("revenue").unwrap().f64().unwrap();

        // (ABC, 2023, 1) first: two rows averaged
        assert_eq!(company.get(0), Some("ABC"));
        assert_eq!(year.get(0), Some(2023));
        assert_eq!(quarter.get(0), Some(1));
        assert_relative_eq!(revenue.get(0).unwrap(), 1100.0);

        assert_eq!(company.get(1), Some("ABC"));
        assert_eq!(quarter.get(1), Some(2));
        assert_eq!(company.get(2), Some("XYZ"));
    }

    #[test]
    fn test_sum_aggregation() {
        let out =
            aggregate_by_period(quarterly_input(), Granularity::Quarterly, AggMethod::Sum).unwrap();
        let revenue = out.column("revenue").unwrap().f64().unwrap();
        assert_relative_eq!(revenue.get(0).unwrap(), 2200.0);
    }

    #[test]
    fn test_yearly_aggregation_drops_unparsed_years() {
        let df = df![
            "company" => ["ABC", "ABC", "ABC"],
            "period" => ["2023-Q1", "2024", "unknown"],
            "revenue" => [1000.0, 2000.0, 3000.0]
        ]
        .unwrap();
        let out = aggregate_by_period(df, Granularity::Yearly, AggMethod::Mean).unwrap();
        assert_eq!(out.height(), 2);
        let year = out.column("year").unwrap().i32().unwrap();
        assert_eq!(year.get(0), Some(2023));
        assert_eq!(year.get(1), Some(2024));
    }

    #[test]
    fn test_quarterly_excludes_rows_without_quarter() {
        let df = df![
            "company" => ["ABC", "ABC"],
            "period" => ["2023-Q1", "2023"],
            "revenue" => [1000.0, 9999.0]
        ]
        .unwrap();
        let out = aggregate_by_period(df, Granularity::Quarterly, AggMethod::Mean).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn test_ungrouped_when_company_missing() {
        let df = df![
            "period" => ["2023-Q1", "2023-Q1"],
            "revenue" => [100.0, 300.0]
        ]
        .unwrap();
        let out = aggregate_by_period(df, Granularity::Quarterly, AggMethod::Mean).unwrap();
        assert_eq!(out.height(), 1);
        let revenue = out.column("revenue").unwrap().f64().unwrap();
        assert_relative_eq!(revenue.get(0).unwrap(), 200.0);
    }

    #[test]
    fn test_granularity_and_method_parsing() {
        assert_eq!("Quarterly".parse::<Granularity>().unwrap(), Granularity::Quarterly);
        assert_eq!("y".parse::<Granularity>().unwrap(), Granularity::Yearly);
        assert!(matches!(
            "weekly".parse::<Granularity>(),
            Err(AnalysisError::InvalidArgument(_))
        ));
        assert_eq!("sum".parse::<AggMethod>().unwrap(), AggMethod::Sum);
        assert!(matches!(
            "median".parse::<AggMethod>(),
            Err(AnalysisError::InvalidArgument(_))
        ));
    }
}
