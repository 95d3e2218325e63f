//! Error types for ww-features.

use thiserror::Error;

/// Errors raised while loading input tables or building the feature table.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A value in a required column failed numeric/date coercion.
    #[error("table `{table}`, column `{column}`: cannot parse {value:?} as {expected}")]
    Coerce {
        table:    &'static str,
        column:   &'static str,
        value:    String,
        expected: &'static str,
    },

    /// CSV-level failure: missing required column, malformed row, etc.
    #[error("table `{table}`: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, FeatureError>`.
pub type FeatureResult<T> = Result<T, FeatureError>;
