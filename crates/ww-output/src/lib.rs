//! `ww-output` — persistence for the waste_watch pipeline.
//!
//! | Module       | Files                                                    |
//! |--------------|----------------------------------------------------------|
//! | [`parquet`]  | the visit feature table (stage-boundary handoff)         |
//! | [`csv`]      | `visit_scores.csv`, `sp_metrics.csv` (dashboard contract)|
//!
//! Every writer is all-or-nothing: output lands in `<path>.tmp` and is
//! renamed into place only after a successful flush, so a failed stage
//! never leaves a partial table behind.

pub mod atomic;
pub mod csv;
pub mod error;
pub mod parquet;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use csv::{write_score_tables, write_sp_metrics, write_visit_scores};
pub use error::{OutputError, OutputResult};
pub use parquet::{read_feature_table, write_feature_table};
