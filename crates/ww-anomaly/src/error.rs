//! Error types for ww-anomaly.

use thiserror::Error;

/// Errors raised by the anomaly engine.
#[derive(Debug, Error)]
pub enum AnomalyError {
    /// Invalid run parameters, caught before any data is touched.
    #[error("configuration error: {0}")]
    Config(String),

    /// The feature table holds no rows; there is nothing to fit or score.
    #[error("empty feature table: nothing to score")]
    EmptyInput,
}

/// Alias for `Result<T, AnomalyError>`.
pub type AnomalyResult<T> = Result<T, AnomalyError>;
