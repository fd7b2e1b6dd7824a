//! Canonical statement schema and column-name normalization.
//!
//! Input tables arrive with arbitrary column naming, commonly Vietnamese or
//! English financial-statement headers. A static synonym table maps each
//! header (trimmed, lower-cased) to its canonical machine-readable key.
//! Unknown headers are never an error: they keep their trimmed, lower-cased
//! spelling and downstream stages treat the canonical fields they do not
//! cover as entirely absent.

use crate::error::Result;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Identifying column holding the company name.
pub const COMPANY: &str = "company";

/// Identifying column holding the free-form reporting-period label.
pub const PERIOD: &str = "period";

/// Canonical numeric fields of a financial-statement record.
pub const NUMERIC_FIELDS: [&str; 14] = [
    "total_assets",
    "current_assets",
    "inventory",
    "cash_and_equivalents",
    "total_liabilities",
    "current_liabilities",
    "long_term_liabilities",
    "equity",
    "revenue",
    "ebit",
    "net_income",
    "accounts_receivable",
    "accounts_payable",
    "operating_cash_flow",
];

/// Synonym table: common column spellings (diacritic and ASCII Vietnamese
/// variants plus English) mapped to canonical keys. Keys are lower-case;
/// lookup is on the trimmed, lower-cased header.
const SYNONYMS: [(&str, &str); 41] = [
    ("tổng tài sản", "total_assets"),
    ("total assets", "total_assets"),
    ("tong tai san", "total_assets"),
    ("tài sản ngắn hạn", "current_assets"),
    ("current assets", "current_assets"),
    ("tai san ngan han", "current_assets"),
    ("hàng tồn kho", "inventory"),
    ("inventory", "inventory"),
    ("hang ton kho", "inventory"),
    ("tiền", "cash_and_equivalents"),
    ("cash", "cash_and_equivalents"),
    ("cash equivalents", "cash_and_equivalents"),
    ("tổng nợ", "total_liabilities"),
    ("total liabilities", "total_liabilities"),
    ("tong no", "total_liabilities"),
    ("nợ ngắn hạn", "current_liabilities"),
    ("current liabilities", "current_liabilities"),
    ("no ngan han", "current_liabilities"),
    ("nợ dài hạn", "long_term_liabilities"),
    ("long-term liabilities", "long_term_liabilities"),
    ("no dai han", "long_term_liabilities"),
    ("vốn chủ sở hữu", "equity"),
    ("equity", "equity"),
    ("von chu so huu", "equity"),
    ("doanh thu", "revenue"),
    ("revenue", "revenue"),
    ("doanh thu thuần", "revenue"),
    ("ebit", "ebit"),
    ("lợi nhuận trước lãi và thuế", "ebit"),
    ("lợi nhuận sau thuế", "net_income"),
    ("net income", "net_income"),
    ("loi nhuan", "net_income"),
    ("phải thu", "accounts_receivable"),
    ("accounts receivable", "accounts_receivable"),
    ("phai thu", "accounts_receivable"),
    ("phải trả", "accounts_payable"),
    ("accounts payable", "accounts_payable"),
    ("phai tra", "accounts_payable"),
    ("dòng tiền từ hoạt động", "operating_cash_flow"),
    ("operating cash flow", "operating_cash_flow"),
    ("dong tien", "operating_cash_flow"),
];

static SYNONYM_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| SYNONYMS.iter().copied().collect());

/// Canonical key for a column header.
///
/// The header is trimmed and lower-cased before lookup; headers outside the
/// synonym table come back in that trimmed, lower-cased spelling. Applying
/// this twice yields the same result.
pub fn canonical_name(header: &str) -> String {
    let key = header.trim().to_lowercase();
    SYNONYM_MAP
        .get(key.as_str())
        .map_or(key, |canonical| (*canonical).to_string())
}

/// Rename the columns of a table to their canonical keys.
///
/// Unknown columns keep their trimmed, lower-cased name. When two input
/// headers map to the same canonical key the first occurrence wins and later
/// ones fall back to their lower-cased original (suffixed if even that
/// collides), since a DataFrame cannot hold duplicate column names.
pub fn normalize_columns(df: DataFrame) -> Result<DataFrame> {
    let mut used: HashSet<String> = HashSet::with_capacity(df.width());
    let mut names: Vec<String> = Vec::with_capacity(df.width());

    for header in df.get_column_names() {
        let mut name = canonical_name(header.as_str());
        if used.contains(&name) {
            name = header.as_str().trim().to_lowercase();
        }
        let mut unique = name.clone();
        let mut n = 1;
        while used.contains(&unique) {
            n += 1;
            unique = format!("{name}_{n}");
        }
        used.insert(unique.clone());
        names.push(unique);
    }

    let mut df = df;
    df.set_column_names(names)?;
    Ok(df)
}

/// Mapping from each input header to its canonical key, in column order.
pub fn column_mapping(df: &DataFrame) -> Vec<(String, String)> {
    df.get_column_names()
        .iter()
        .map(|header| (header.to_string(), canonical_name(header.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(names: &[&str]) -> DataFrame {
        let columns: Vec<Column> = names
            .iter()
            .map(|n| Series::new((*n).into(), vec![1.0f64]).into())
            .collect();
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_canonical_name_english_and_vietnamese() {
        assert_eq!(canonical_name("Total Assets"), "total_assets");
        assert_eq!(canonical_name("  Doanh thu "), "revenue");
        assert_eq!(canonical_name("Tổng nợ"), "total_liabilities");
        assert_eq!(canonical_name("no dai han"), "long_term_liabilities");
        assert_eq!(canonical_name("Cash"), "cash_and_equivalents");
    }

    #[test]
    fn test_unknown_header_kept_lowercased() {
        assert_eq!(canonical_name("  Segment Notes "), "segment notes");
        assert_eq!(canonical_name("company"), "company");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let df = frame(&["Tổng tài sản", "Doanh thu", "EBIT", "Ghi chú"]);
        let once = normalize_columns(df).unwrap();
        let names_once: Vec<String> = once
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let twice = normalize_columns(once).unwrap();
        let names_twice: Vec<String> = twice
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names_once, names_twice);
        assert_eq!(names_once, vec!["total_assets", "revenue", "ebit", "ghi chú"]);
    }

    #[test]
    fn test_colliding_headers_first_wins() {
        let df = frame(&["Revenue", "Doanh thu"]);
        let out = normalize_columns(df).unwrap();
        let names: Vec<String> = out
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names[0], "revenue");
        assert_eq!(names[1], "doanh thu");
    }

    #[test]
    fn test_column_mapping_reports_canonical_keys() {
        let df = frame(&["company", "Vốn chủ sở hữu"]);
        let mapping = column_mapping(&df);
        assert_eq!(
            mapping,
            vec![
                ("company".to_string(), "company".to_string()),
                ("Vốn chủ sở hữu".to_string(), "equity".to_string()),
            ]
        );
    }
}
