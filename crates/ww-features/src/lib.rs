//! `ww-features` — the feature builder stage of the waste_watch pipeline.
//!
//! Takes three normalized input tables (visit records, per-asset capacities,
//! service-point coordinates) and produces one row per service point per
//! calendar day with derived utilization features: fill ratio, inter-visit
//! interval, generation rate, and trailing rolling load statistics.
//!
//! Input normalization (sheet discovery, column renaming) is an upstream
//! collaborator's job; this crate expects the canonical column names
//! documented in [`record`].

pub mod builder;
pub mod error;
pub mod record;
pub mod table;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::{BuildStats, ROLLING_WINDOW, WEIGHT_MATERIAL, build_features};
pub use error::{FeatureError, FeatureResult};
pub use record::{
    CapacityRecord, GeoRecord, RawVisitRecord, load_capacity_csv, load_capacity_reader,
    load_geo_csv, load_geo_reader, load_visits_csv, load_visits_reader,
};
pub use table::VisitFeatureRow;
