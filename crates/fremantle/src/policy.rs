//! Named assessment policies.
//!
//! Three independent policy families live here and are deliberately not
//! unified: the Altman Z′ interpretation bands used by the ratio engine, the
//! quick leverage/efficiency bands used by the four-field assessment, and the
//! per-row credit recommendation rules. Each carries its own hard-coded
//! thresholds.

use crate::error::{AnalysisError, Result};
use crate::frame::numeric_cleaned;
use crate::ratios::ALTMAN_Z;
use crate::schema::{self, COMPANY, PERIOD};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Altman Z′ interpretation bands.
///
/// Boundary scores belong to the higher band: 1.8 is moderate, 2.99 is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    /// Score could not be computed.
    #[serde(rename = "Insufficient data")]
    Insufficient,
    /// Score below 1.8.
    #[serde(rename = "High risk of bankruptcy")]
    High,
    /// Score in [1.8, 2.99).
    #[serde(rename = "Moderate risk")]
    Moderate,
    /// Score of 2.99 or above.
    #[serde(rename = "Low risk")]
    Low,
}

impl RiskBand {
    /// Classify a Z′ score.
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => Self::Insufficient,
            Some(z) if !z.is_finite() => Self::Insufficient,
            Some(z) if z < 1.8 => Self::High,
            Some(z) if z < 2.99 => Self::Moderate,
            Some(_) => Self::Low,
        }
    }

    /// Canonical textual form, as stored in the interpretation column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insufficient => "Insufficient data",
            Self::High => "High risk of bankruptcy",
            Self::Moderate => "Moderate risk",
            Self::Low => "Low risk",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leverage band over the mean liabilities-to-assets ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeverageBand {
    /// Mean debt ratio above 0.6.
    #[serde(rename = "High risk (debt is high relative to assets)")]
    High,
    /// Mean debt ratio above 0.4.
    #[serde(rename = "Moderate risk")]
    Moderate,
    /// Mean debt ratio of 0.4 or below.
    #[serde(rename = "Low risk")]
    Low,
}

impl LeverageBand {
    /// Classify a mean liabilities/assets ratio.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > 0.6 {
            Self::High
        } else if ratio > 0.4 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Efficiency band over the mean net-profit margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EfficiencyBand {
    /// Mean margin below 0.05.
    #[serde(rename = "Low efficiency")]
    Low,
    /// Mean margin below 0.15.
    #[serde(rename = "Moderate efficiency")]
    Moderate,
    /// Mean margin of 0.15 or above.
    #[serde(rename = "High efficiency")]
    High,
}

impl EfficiencyBand {
    /// Classify a mean net-profit margin.
    pub fn from_margin(margin: f64) -> Self {
        if margin < 0.05 {
            Self::Low
        } else if margin < 0.15 {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

/// Result of the four-field quick assessment.
#[derive(Debug, Clone, Serialize)]
pub struct QuickAssessment {
    /// Number of records assessed.
    pub records: usize,
    /// Mean liabilities/assets ratio, rounded to 2 decimals.
    pub avg_debt_ratio: Option<f64>,
    /// Mean net-income/revenue margin, rounded to 2 decimals.
    pub avg_profit_margin: Option<f64>,
    /// Leverage classification, absent when the mean could not be computed.
    pub leverage: Option<LeverageBand>,
    /// Efficiency classification, absent when the mean could not be computed.
    pub efficiency: Option<EfficiencyBand>,
}

/// Fields the quick assessment requires after normalization.
const QUICK_FIELDS: [&str; 4] = ["total_assets", "total_liabilities", "revenue", "net_income"];

/// Quick leverage/efficiency assessment over raw records.
///
/// Unlike the ratio engine, the four canonical fields are required here;
/// a missing one is a validation error.
pub fn quick_assessment(df: DataFrame) -> Result<QuickAssessment> {
    if df.height() == 0 {
        return Err(AnalysisError::EmptyInput);
    }
    let df = schema::normalize_columns(df)?;
    for field in QUICK_FIELDS {
        if df.column(field).is_err() {
            return Err(AnalysisError::MissingColumn {
                column: field.to_string(),
            });
        }
    }

    let records = df.height();
    let ratios = df
        .lazy()
        .with_columns(QUICK_FIELDS.map(numeric_cleaned))
        .select([
            when(col("total_assets").neq(lit(0.0)))
                .then(col("total_liabilities") / col("total_assets"))
                .otherwise(lit(NULL))
                .alias("debt_ratio"),
            when(col("revenue").neq(lit(0.0)))
                .then(col("net_income") / col("revenue"))
                .otherwise(lit(NULL))
                .alias("profit_margin"),
        ])
        .collect()?;

    let avg_debt_ratio = ratios.column("debt_ratio")?.f64()?.mean().map(round2);
    let avg_profit_margin = ratios.column("profit_margin")?.f64()?.mean().map(round2);

    Ok(QuickAssessment {
        records,
        avg_debt_ratio,
        avg_profit_margin,
        leverage: avg_debt_ratio.map(LeverageBand::from_ratio),
        efficiency: avg_profit_margin.map(EfficiencyBand::from_margin),
    })
}

/// Credit recommendation derived from the Z′ score and liquidity/leverage
/// ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// Strong score, liquid, moderately levered.
    #[serde(rename = "Approve with standard collateral")]
    Approve,
    /// Grey-zone score with acceptable liquidity.
    #[serde(rename = "Consider with additional guarantees & monitoring")]
    Consider,
    /// Weak score or weak ratios.
    #[serde(rename = "Decline or require strong collateral")]
    Decline,
    /// No usable score.
    #[serde(rename = "Decline")]
    NoScore,
}

impl Recommendation {
    /// Apply the recommendation rules to one record's metrics.
    ///
    /// A missing current ratio counts as 0 and a missing debt-to-equity as
    /// 999, biasing toward decline rather than silently passing.
    pub fn assess(
        z_score: Option<f64>,
        current_ratio: Option<f64>,
        debt_to_equity: Option<f64>,
    ) -> Self {
        let Some(z) = z_score.filter(|z| z.is_finite()) else {
            return Self::NoScore;
        };
        let cr = current_ratio.filter(|v| v.is_finite()).unwrap_or(0.0);
        let dte = debt_to_equity.filter(|v| v.is_finite()).unwrap_or(999.0);

        if z > 2.99 && cr >= 1.2 && dte < 2.0 {
            Self::Approve
        } else if z > 1.8 && z <= 2.99 && cr >= 1.0 {
            Self::Consider
        } else {
            Self::Decline
        }
    }
}

/// Per-record credit decision, as served by the recommendation surface.
#[derive(Debug, Clone, Serialize)]
pub struct CreditDecision {
    /// Company name, when the input carries one.
    pub company: Option<String>,
    /// Reporting-period label, when the input carries one.
    pub period: Option<String>,
    /// Altman Z′ score.
    pub altman_z: Option<f64>,
    /// Interpretation band of the score.
    pub z_interpretation: RiskBand,
    /// Debt-to-equity ratio.
    pub debt_to_equity: Option<f64>,
    /// Current ratio.
    pub current_ratio: Option<f64>,
    /// Recommendation under the credit policy.
    pub recommendation: Recommendation,
}

/// Build per-record credit decisions from a ratio-augmented table.
pub fn credit_decisions(df: &DataFrame) -> Result<Vec<CreditDecision>> {
    let companies = str_values(df, COMPANY);
    let periods = str_values(df, PERIOD);
    let z_scores = f64_values(df, ALTMAN_Z);
    let debt_to_equity = f64_values(df, "debt_to_equity");
    let current_ratio = f64_values(df, "current_ratio");

    let decisions = (0..df.height())
        .map(|i| {
            let z = z_scores[i];
            CreditDecision {
                company: companies[i].clone(),
                period: periods[i].clone(),
                altman_z: z,
                z_interpretation: RiskBand::from_score(z),
                debt_to_equity: debt_to_equity[i],
                current_ratio: current_ratio[i],
                recommendation: Recommendation::assess(z, current_ratio[i], debt_to_equity[i]),
            }
        })
        .collect();

    Ok(decisions)
}

fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .ok()
        .and_then(|column| column.f64().ok().map(|ca| ca.into_iter().collect()))
        .unwrap_or_else(|| vec![None; df.height()])
}

fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .ok()
        .and_then(|column| column.cast(&DataType::String).ok())
        .and_then(|column| {
            column
                .str()
                .ok()
                .map(|ca| ca.into_iter().map(|v| v.map(str::to_string)).collect())
        })
        .unwrap_or_else(|| vec![None; df.height()])
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
