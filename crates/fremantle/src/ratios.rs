//! Ratio engine: guarded financial-ratio derivation and the Altman Z′
//! composite.
//!
//! Every ratio divides two canonical fields with the denominator guarded:
//! a zero or null denominator (or a null numerator) yields null, never a
//! division by zero and never a non-finite float. Canonical fields absent
//! from the input are synthesized as all-null columns first so every formula
//! stays well-defined.

use crate::error::{AnalysisError, Result};
use crate::frame::numeric_cleaned;
use crate::policy::RiskBand;
use crate::schema::{self, NUMERIC_FIELDS};
use polars::prelude::*;

/// Ratio columns added by [`compute_ratios`], in output order.
pub const RATIO_COLUMNS: [&str; 19] = [
    "debt_to_equity",
    "debt_to_revenue",
    "current_ratio",
    "quick_ratio",
    "short_term_debt_ratio",
    "long_term_debt_ratio",
    "receivables_turnover",
    "payables_turnover",
    "cash_flow_margin",
    "equity_ratio",
    "liabilities_ratio",
    "roa",
    "roe",
    "short_term_debt_to_equity",
    "short_term_debt_to_revenue",
    "long_term_debt_to_equity",
    "long_term_debt_to_revenue",
    "altman_z_prime",
    "altman_z_interpretation",
];

/// Name of the composite score column.
pub const ALTMAN_Z: &str = "altman_z_prime";

/// Name of the categorical interpretation column.
pub const ALTMAN_Z_INTERPRETATION: &str = "altman_z_interpretation";

/// Division guarded against zero and null denominators.
fn guarded(numerator: Expr, denominator: Expr) -> Expr {
    when(denominator.clone().neq(lit(0.0)))
        .then(numerator / denominator)
        .otherwise(lit(NULL))
}

fn ratio(numerator: &str, denominator: &str) -> Expr {
    guarded(col(numerator), col(denominator))
}

/// Augment a record table with the full ratio set and the Altman Z′ score.
///
/// The input is column-normalized first; canonical numeric fields present in
/// the table are coerced through the string-cleaning numeric conversion and
/// missing ones are synthesized as all-null columns. The transformation is
/// pure: a fresh table is returned, ratios are recomputed from raw fields on
/// every call.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyInput`] for an empty record set. Missing
/// columns are never an error.
pub fn compute_ratios(df: DataFrame) -> Result<DataFrame> {
    if df.height() == 0 {
        return Err(AnalysisError::EmptyInput);
    }

    let df = schema::normalize_columns(df)?;

    let prep: Vec<Expr> = NUMERIC_FIELDS
        .iter()
        .map(|field| {
            if df.column(field).is_ok() {
                numeric_cleaned(field)
            } else {
                lit(NULL).cast(DataType::Float64).alias(*field)
            }
        })
        .collect();

    let out = df
        .lazy()
        .with_columns(prep)
        .with_columns([
            ratio("total_liabilities", "equity").alias("debt_to_equity"),
            ratio("total_liabilities", "revenue").alias("debt_to_revenue"),
            ratio("current_assets", "current_liabilities").alias("current_ratio"),
            guarded(
                col("current_assets") - col("inventory"),
                col("current_liabilities"),
            )
            .alias("quick_ratio"),
            ratio("current_liabilities", "total_liabilities").alias("short_term_debt_ratio"),
            ratio("long_term_liabilities", "total_liabilities").alias("long_term_debt_ratio"),
            ratio("revenue", "accounts_receivable").alias("receivables_turnover"),
            ratio("revenue", "accounts_payable").alias("payables_turnover"),
            ratio("operating_cash_flow", "revenue").alias("cash_flow_margin"),
            ratio("equity", "total_assets").alias("equity_ratio"),
            ratio("total_liabilities", "total_assets").alias("liabilities_ratio"),
            ratio("net_income", "total_assets").alias("roa"),
            ratio("net_income", "equity").alias("roe"),
            ratio("current_liabilities", "equity").alias("short_term_debt_to_equity"),
            ratio("current_liabilities", "revenue").alias("short_term_debt_to_revenue"),
            ratio("long_term_liabilities", "equity").alias("long_term_debt_to_equity"),
            ratio("long_term_liabilities", "revenue").alias("long_term_debt_to_revenue"),
        ])
        .with_columns([altman_z_prime().alias(ALTMAN_Z)])
        .with_columns([altman_interpretation().alias(ALTMAN_Z_INTERPRETATION)])
        .collect()?;

    Ok(out)
}

/// Altman Z′ composite for non-listed, non-manufacturing firms.
///
/// Weighted sum over five guarded components; net income stands in for
/// retained earnings. Any null component makes the score null.
fn altman_z_prime() -> Expr {
    let a = guarded(
        col("current_assets") - col("current_liabilities"),
        col("total_assets"),
    );
    let b = ratio("net_income", "total_assets");
    let c = ratio("ebit", "total_assets");
    let d = ratio("equity", "total_liabilities");
    let e = ratio("revenue", "total_assets");

    lit(0.717) * a + lit(0.847) * b + lit(3.107) * c + lit(0.420) * d + lit(0.998) * e
}

fn altman_interpretation() -> Expr {
    when(col(ALTMAN_Z).is_null())
        .then(lit(RiskBand::Insufficient.as_str()))
        .when(col(ALTMAN_Z).lt(lit(1.8)))
        .then(lit(RiskBand::High.as_str()))
        .when(col(ALTMAN_Z).lt(lit(2.99)))
        .then(lit(RiskBand::Moderate.as_str()))
        .otherwise(lit(RiskBand::Low.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> DataFrame {
        df![
            "company" => ["ABC"],
            "period" => ["2023-Q1"],
            "Doanh thu" => [1_200_000.0],
            "Tổng tài sản" => [5_000_000.0],
            "Tài sản ngắn hạn" => [2_000_000.0],
            "Hàng tồn kho" => [300_000.0],
            "Tổng nợ" => [3_000_000.0],
            "Nợ ngắn hạn" => [1_200_000.0],
            "Nợ dài hạn" => [1_800_000.0],
            "Vốn chủ sở hữu" => [2_000_000.0],
            "EBIT" => [250_000.0],
            "Lợi nhuận sau thuế" => [180_000.0],
            "Phải thu" => [350_000.0],
            "Phải trả" => [220_000.0],
            "Dòng tiền từ hoạt động" => [210_000.0]
        ]
        .unwrap()
    }

    fn scalar(df: &DataFrame, column: &str) -> Option<f64> {
        df.column(column).unwrap().f64().unwrap().get(0)
    }

    #[test]
    fn test_ratios_from_vietnamese_headers() {
        let out = compute_ratios(sample()).unwrap();

        assert_relative_eq!(scalar(&out, "debt_to_equity").unwrap(), 1.5);
        assert_relative_eq!(scalar(&out, "debt_to_revenue").unwrap(), 2.5);
        assert_relative_eq!(
            scalar(&out, "current_ratio").unwrap(),
            2_000_000.0 / 1_200_000.0
        );
        assert_relative_eq!(
            scalar(&out, "quick_ratio").unwrap(),
            1_700_000.0 / 1_200_000.0
        );
        assert_relative_eq!(scalar(&out, "short_term_debt_ratio").unwrap(), 0.4);
        assert_relative_eq!(scalar(&out, "long_term_debt_ratio").unwrap(), 0.6);
        assert_relative_eq!(scalar(&out, "equity_ratio").unwrap(), 0.4);
        assert_relative_eq!(scalar(&out, "liabilities_ratio").unwrap(), 0.6);
        assert_relative_eq!(scalar(&out, "roa").unwrap(), 0.036);
        assert_relative_eq!(scalar(&out, "roe").unwrap(), 0.09);
        assert_relative_eq!(scalar(&out, "cash_flow_margin").unwrap(), 0.175);
    }

    #[test]
    fn test_altman_z_prime_value() {
        let out = compute_ratios(sample()).unwrap();

        // A = (2.0M - 1.2M) / 5.0M, B = 0.18M / 5.0M, C = 0.25M / 5.0M,
        // D = 2.0M / 3.0M, E = 1.2M / 5.0M
        let expected = 0.717 * 0.16 + 0.847 * 0.036 + 3.107 * 0.05 + 0.420 * (2.0 / 3.0) + 0.998 * 0.24;
        assert_relative_eq!(scalar(&out, ALTMAN_Z).unwrap(), expected, epsilon = 1e-12);

        let interp = out
            .column(ALTMAN_Z_INTERPRETATION)
            .unwrap()
            .str()
            .unwrap()
            .get(0)
            .unwrap();
        assert_eq!(interp, "High risk of bankruptcy");
    }

    #[test]
    fn test_zero_equity_yields_null_not_error() {
        let df = df![
            "equity" => [0.0],
            "total_liabilities" => [1_000.0],
            "net_income" => [50.0]
        ]
        .unwrap();
        let out = compute_ratios(df).unwrap();
        assert_eq!(scalar(&out, "debt_to_equity"), None);
        assert_eq!(scalar(&out, "roe"), None);
    }

    #[test]
    fn test_missing_fields_yield_null_ratios() {
        let df = df!["company" => ["ABC"], "period" => ["2024"]].unwrap();
        let out = compute_ratios(df).unwrap();
        assert_eq!(out.height(), 1);
        for column in ["debt_to_equity", "current_ratio", "roa", ALTMAN_Z] {
            assert_eq!(scalar(&out, column), None, "{column} should be null");
        }
        let interp = out
            .column(ALTMAN_Z_INTERPRETATION)
            .unwrap()
            .str()
            .unwrap()
            .get(0)
            .unwrap();
        assert_eq!(interp, "Insufficient data");
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let df = DataFrame::empty();
        assert!(matches!(
            compute_ratios(df),
            Err(AnalysisError::EmptyInput)
        ));
    }

    #[test]
    fn test_string_values_with_separators() {
        let df = df![
            "revenue" => ["1,000"],
            "total_liabilities" => ["500"]
        ]
        .unwrap();
        let out = compute_ratios(df).unwrap();
        assert_relative_eq!(scalar(&out, "debt_to_revenue").unwrap(), 0.5);
    }
}
