#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod error;
pub mod frame;
pub mod period;
pub mod policy;
pub mod ratios;
pub mod schema;
pub mod variation;

pub use aggregate::{AggMethod, Granularity, aggregate_by_period};
pub use error::{AnalysisError, Result};
pub use frame::records_to_frame;
pub use period::{PeriodParts, add_period_parts, parse_period};
pub use policy::{
    CreditDecision, EfficiencyBand, LeverageBand, QuickAssessment, Recommendation, RiskBand,
    credit_decisions, quick_assessment,
};
pub use ratios::compute_ratios;
pub use variation::compute_variation;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
