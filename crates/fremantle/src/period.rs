//! Reporting-period label parsing.
//!
//! Period labels arrive free-form: `2024-Q1`, `2024q1`, `2024/03`, `2024.3`,
//! or a bare `2024`. Parsing is a pure function of the label; anything
//! unrecognizable yields all-null parts rather than an error.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Parsed parts of a reporting-period label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodParts {
    /// Calendar year.
    pub year: Option<i32>,
    /// Quarter (1–4), parsed directly or derived from the month.
    pub quarter: Option<i32>,
    /// Month (1–12), only present for month-form labels.
    pub month: Option<i32>,
    /// Canonical label: `YYYY-Qn`, `YYYY-MM` or `YYYY`.
    pub period_std: Option<String>,
}

impl PeriodParts {
    fn quarter_form(year: i32, quarter: i32) -> Self {
        Self {
            year: Some(year),
            quarter: Some(quarter),
            month: None,
            period_std: Some(format!("{year}-Q{quarter}")),
        }
    }

    fn month_form(year: i32, month: i32) -> Self {
        Self {
            year: Some(year),
            quarter: Some((month - 1) / 3 + 1),
            month: Some(month),
            period_std: Some(format!("{year}-{month:02}")),
        }
    }

    fn year_form(year: i32) -> Self {
        Self {
            year: Some(year),
            quarter: None,
            month: None,
            period_std: Some(year.to_string()),
        }
    }
}

/// Parse a free-form period label into its parts.
///
/// Recognition order: quarter form (`YYYY-Qn` / `YYYYQn`, case-insensitive,
/// `/` and `_` accepted as separators), month form (`YYYY{sep}MM` with sep in
/// `-`, `/`, `.`; only the first two segments matter), bare year. A label
/// containing `Q` that fails quarter parsing yields all-null parts; it does
/// not fall through to the other forms. Quarters outside 1–4 and months
/// outside 1–12 count as unparseable.
pub fn parse_period(label: &str) -> PeriodParts {
    let s = label.trim().to_uppercase().replace(' ', "");
    if s.is_empty() {
        return PeriodParts::default();
    }

    if s.contains('Q') {
        let norm = s.replace(['/', '_'], "-");
        let (y, q) = norm
            .split_once("-Q")
            .or_else(|| norm.split_once('Q'))
            .unwrap_or(("", ""));
        if let (Ok(year), Ok(quarter)) = (y.parse::<i32>(), q.parse::<i32>()) {
            if (1..=4).contains(&quarter) {
                return PeriodParts::quarter_form(year, quarter);
            }
        }
        return PeriodParts::default();
    }

    for sep in ['-', '/', '.'] {
        if !s.contains(sep) {
            continue;
        }
        let mut segments = s.split(sep);
        let y = segments.next().unwrap_or("");
        let m = segments.next().unwrap_or("");
        if let (Ok(year), Ok(month)) = (y.parse::<i32>(), m.parse::<i32>()) {
            if (1..=12).contains(&month) {
                return PeriodParts::month_form(year, month);
            }
        }
    }

    s.parse::<i32>()
        .map_or_else(|_| PeriodParts::default(), PeriodParts::year_form)
}

/// Attach `year`, `quarter`, `month` and `period_std` columns derived from
/// the `period` column. A table without a `period` column passes through
/// unchanged.
pub fn add_period_parts(df: DataFrame) -> Result<DataFrame> {
    if df.column(crate::schema::PERIOD).is_err() {
        return Ok(df);
    }

    let labels = df.column(crate::schema::PERIOD)?.cast(&DataType::String)?;
    let labels = labels.str()?;

    let mut years: Vec<Option<i32>> = Vec::with_capacity(df.height());
    let mut quarters: Vec<Option<i32>> = Vec::with_capacity(df.height());
    let mut months: Vec<Option<i32>> = Vec::with_capacity(df.height());
    let mut stds: Vec<Option<String>> = Vec::with_capacity(df.height());

    for label in labels.into_iter() {
        let parts = label.map(parse_period).unwrap_or_default();
        years.push(parts.year);
        quarters.push(parts.quarter);
        months.push(parts.month);
        stds.push(parts.period_std);
    }

    let mut df = df;
    df.with_column(Series::new("year".into(), years))?;
    df.with_column(Series::new("quarter".into(), quarters))?;
    df.with_column(Series::new("month".into(), months))?;
    df.with_column(Series::new("period_std".into(), stds))?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-Q1", Some(2024), Some(1), None, Some("2024-Q1"))]
    #[case("2024Q3", Some(2024), Some(3), None, Some("2024-Q3"))]
    #[case("2024/q2", Some(2024), Some(2), None, Some("2024-Q2"))]
    #[case("2024_Q4", Some(2024), Some(4), None, Some("2024-Q4"))]
    #[case(" 2023 - q1 ", Some(2023), Some(1), None, Some("2023-Q1"))]
    #[case("2024-03", Some(2024), Some(1), Some(3), Some("2024-03"))]
    #[case("2024/3", Some(2024), Some(1), Some(3), Some("2024-03"))]
    #[case("2024.11", Some(2024), Some(4), Some(11), Some("2024-11"))]
    #[case("2024-06-30", Some(2024), Some(2), Some(6), Some("2024-06"))]
    #[case("2024", Some(2024), None, None, Some("2024"))]
    #[case("garbage", None, None, None, None)]
    #[case("", None, None, None, None)]
    #[case("2024-Q7", None, None, None, None)]
    #[case("2024-13", None, None, None, None)]
    #[case("Q1", None, None, None, None)]
    #[case("2024-XX", None, None, None, None)]
    fn test_parse_period(
        #[case] label: &str,
        #[case] year: Option<i32>,
        #[case] quarter: Option<i32>,
        #[case] month: Option<i32>,
        #[case] std: Option<&str>,
    ) {
        let parts = parse_period(label);
        assert_eq!(parts.year, year, "year for {label:?}");
        assert_eq!(parts.quarter, quarter, "quarter for {label:?}");
        assert_eq!(parts.month, month, "month for {label:?}");
        assert_eq!(parts.period_std.as_deref(), std, "std for {label:?}");
    }

    #[test]
    fn test_parse_is_pure() {
        assert_eq!(parse_period("2024-Q1"), parse_period("2024-Q1"));
    }

    #[test]
    fn test_add_period_parts_attaches_columns() {
        let df = df![
            "company" => ["ABC", "ABC", "XYZ"],
            "period" => ["2023-Q1", "2023-04", "bad"]
        ]
        .unwrap();

        let out = add_period_parts(df).unwrap();
        let year = out.column("year").unwrap().i32().unwrap();
        let quarter = out.column("quarter").unwrap().i32().unwrap();
        let month = out.column("month").unwrap().i32().unwrap();
        let std = out.column("period_std").unwrap().str().unwrap();

        assert_eq!(year.get(0), Some(2023));
        assert_eq!(quarter.get(0), Some(1));
        assert_eq!(month.get(0), None);
        assert_eq!(std.get(0), Some("2023-Q1"));

        assert_eq!(quarter.get(1), Some(2));
        assert_eq!(month.get(1), Some(4));
        assert_eq!(std.get(1), Some("2023-04"));

        assert_eq!(year.get(2), None);
        assert_eq!(std.get(2), None);
    }

    #[test]
    fn test_add_period_parts_without_period_column() {
        let df = df!["company" => ["ABC"]].unwrap();
        let out = add_period_parts(df).unwrap();
        assert!(out.column("year").is_err());
        assert_eq!(out.width(), 1);
    }
}
