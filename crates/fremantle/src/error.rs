//! Error types for the statement-analysis pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur in the statement-analysis pipeline.
///
/// Arithmetic edge cases (zero or missing denominators) are deliberately not
/// errors: they yield null values that propagate through every downstream
/// stage.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Empty input record set
    #[error("no records provided")]
    EmptyInput,

    /// A required identifying column is missing from the input
    #[error("missing required column: {column}")]
    MissingColumn {
        /// Name of the missing column
        column: String,
    },

    /// An argument outside the allowed set
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Polars error
    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
