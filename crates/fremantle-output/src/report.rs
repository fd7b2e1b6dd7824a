//! Analysis report generation.
//!
//! The report is the presentation of one analyze call: the input-to-canonical
//! column mapping, summary averages rounded to two decimals, and a risk line
//! derived from the majority Altman interpretation. This is the only place
//! where ratio values are rounded.

use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Polars error.
    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Summary averages over a ratio table, rounded to two decimals.
#[derive(Debug, Clone, Serialize)]
pub struct RatioSummary {
    /// Mean debt-to-equity ratio.
    pub avg_debt_to_equity: Option<f64>,
    /// Mean profit margin proxy (return on assets).
    pub avg_profit_margin: Option<f64>,
    /// Mean current ratio.
    pub avg_current_ratio: Option<f64>,
}

/// A report over one analyzed record set.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Input column name to canonical key.
    pub mapping: BTreeMap<String, String>,
    /// Rounded summary averages.
    pub summary: RatioSummary,
    /// Risk lines, led by the majority Altman interpretation.
    pub risk_analysis: Vec<String>,
    /// Number of records analyzed.
    pub records_analyzed: usize,
}

impl AnalysisReport {
    /// Build a report from a ratio-augmented table and the column mapping
    /// recorded before normalization.
    pub fn from_ratios(
        mapping: &[(String, String)],
        ratios: &DataFrame,
    ) -> Result<Self, ReportError> {
        let summary = RatioSummary {
            avg_debt_to_equity: column_mean(ratios, "debt_to_equity")?,
            avg_profit_margin: column_mean(ratios, "roa")?,
            avg_current_ratio: column_mean(ratios, "current_ratio")?,
        };

        let majority = majority_interpretation(ratios)?;
        let risk_analysis = vec![format!("Altman Z summary: {majority}")];

        Ok(Self {
            mapping: mapping.iter().cloned().collect(),
            summary,
            risk_analysis,
            records_analyzed: ratios.height(),
        })
    }

    /// Convert report to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Financial Analysis Report")?;
        writeln!(f, "  Records analyzed:     {}", self.records_analyzed)?;
        writeln!(
            f,
            "  Avg debt-to-equity:   {}",
            display_value(self.summary.avg_debt_to_equity)
        )?;
        writeln!(
            f,
            "  Avg profit margin:    {}",
            display_value(self.summary.avg_profit_margin)
        )?;
        writeln!(
            f,
            "  Avg current ratio:    {}",
            display_value(self.summary.avg_current_ratio)
        )?;
        for line in &self.risk_analysis {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

fn display_value(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn column_mean(df: &DataFrame, name: &str) -> Result<Option<f64>, ReportError> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    Ok(column.f64()?.mean().map(round2))
}

/// Most frequent Altman interpretation in the table; count ties break toward
/// the lexically larger band so the result is deterministic.
fn majority_interpretation(df: &DataFrame) -> Result<String, ReportError> {
    let Ok(column) = df.column("altman_z_interpretation") else {
        return Ok("Insufficient data".to_string());
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in column.str()?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    Ok(counts
        .into_iter()
        .max_by_key(|(name, count)| (*count, name.to_string()))
        .map_or_else(|| "Insufficient data".to_string(), |(name, _)| name.to_string()))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
