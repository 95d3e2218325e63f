//! `ww-anomaly` — the anomaly-scoring stage of the waste_watch pipeline.
//!
//! Consumes the visit feature table, adds two symmetric utilization features
//! (so over- and under-filled containers are both visible to the model),
//! fits an isolation forest, calibrates a score cutoff from the expected
//! contamination rate, and rolls visit-level anomalies up into one risk
//! row per service point.
//!
//! All randomness derives from one explicit seed; runs are bit-reproducible
//! regardless of how many Rayon workers fit the trees.

pub mod engine;
pub mod error;
pub mod forest;
pub mod metrics;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use engine::{EngineParams, ScoredVisits, VisitScoreRow, score_visits};
pub use error::{AnomalyError, AnomalyResult};
pub use forest::IsolationForest;
pub use metrics::{SpMetricRow, build_sp_metrics};
