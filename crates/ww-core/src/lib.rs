//! `ww-core` — foundational types for the `waste_watch` anomaly pipeline.
//!
//! This crate is a dependency of every other `ww-*` crate.  It intentionally
//! has no `ww-*` dependencies and minimal external ones (only `rand` and
//! `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                               |
//! |------------|--------------------------------------------------------|
//! | [`ids`]    | `SpId` — service-point identifier                      |
//! | [`geo`]    | `GeoPoint`, haversine distance                         |
//! | [`rng`]    | `RunRng` — per-run deterministic seed derivation       |
//! | [`stats`]  | mean/std, quantiles, trailing rolling statistics       |

pub mod geo;
pub mod ids;
pub mod rng;
pub mod stats;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use geo::GeoPoint;
pub use ids::SpId;
pub use rng::RunRng;
