//! Period-over-period variation of aggregated series.
//!
//! Within each company partition, ordered by year[, quarter], every metric
//! column gets a lagged percentage change `{metric}_chg_1`; quarterly series
//! additionally get the four-period lag `{metric}_chg_4` (same quarter, prior
//! year). A change is null when there is no lagged row or the lagged value is
//! null or zero.

use crate::aggregate::Granularity;
use crate::error::Result;
use crate::frame::is_numeric_dtype;
use crate::schema::COMPANY;
use polars::prelude::*;

/// Period-part columns that are never treated as metrics.
const PERIOD_PART_COLUMNS: [&str; 3] = ["year", "quarter", "month"];

/// Guarded lagged percentage change of one metric.
fn pct_change(metric: &str, lag: i64, partition: Option<&[Expr]>) -> Expr {
    let lagged = match partition {
        Some(keys) => col(metric).shift(lit(lag)).over(keys),
        None => col(metric).shift(lit(lag)),
    };
    when(lagged.clone().neq(lit(0.0)))
        .then((col(metric) - lagged.clone()) / lagged)
        .otherwise(lit(NULL))
        .alias(format!("{metric}_chg_{lag}"))
}

/// Attach sequential (and, for quarterly series, year-over-year) percentage
/// changes to an aggregated series.
///
/// Metrics are the numeric columns of the series minus the period-part
/// columns. A series without a `company` column is treated as one implicit
/// group.
pub fn compute_variation(df: DataFrame, granularity: Granularity) -> Result<DataFrame> {
    let mut sort_cols: Vec<PlSmallStr> = Vec::new();
    let has_company = df.column(COMPANY).is_ok();
    if has_company {
        sort_cols.push(COMPANY.into());
    }
    sort_cols.push("year".into());
    if granularity == Granularity::Quarterly {
        sort_cols.push("quarter".into());
    }

    let metrics: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|column| {
            is_numeric_dtype(column.dtype()) && !PERIOD_PART_COLUMNS.contains(&column.name().as_str())
        })
        .map(|column| column.name().to_string())
        .collect();

    let partition: Option<Vec<Expr>> = has_company.then(|| vec![col(COMPANY)]);
    let partition = partition.as_deref();

    let mut changes: Vec<Expr> = metrics
        .iter()
        .map(|metric| pct_change(metric, 1, partition))
        .collect();
    if granularity == Granularity::Quarterly {
        changes.extend(metrics.iter().map(|metric| pct_change(metric, 4, partition)));
    }

    let out = df
        .lazy()
        .sort(sort_cols, SortMultipleOptions::default())
        .with_columns(changes)
        .collect()?;

    Ok(out)
}
