#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{PeriodLevel, RatioStore, StoreStats};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
