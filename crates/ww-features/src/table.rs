//! Plain data row produced by the feature builder.

use chrono::NaiveDate;

use ww_core::{GeoPoint, SpId};

/// One service point × calendar day with at least one qualifying visit.
///
/// Interval and generation rate are `None` for the first visit of a service
/// point (no preceding visit to measure against).  Coordinates are `None`
/// when the geo table has no entry for the point — geo is enrichment, never
/// a row-dropping gate.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitFeatureRow {
    pub service_point: SpId,
    pub visit_date:    NaiveDate,
    /// Total load collected that day, kg.
    pub load_kg:       f64,
    /// Summed rated capacity of all assets at the point, kg.
    pub capacity_kg:   f64,
    /// `load_kg / capacity_kg`; values above 1.0 indicate overflow.
    pub fill_ratio:    f64,
    pub geo:           Option<GeoPoint>,
    /// Days since this point's previous visit.
    pub interval_days: Option<f64>,
    /// `load_kg / interval_days`, an estimated daily accumulation rate.
    pub gen_rate:      Option<f64>,
    /// Trailing rolling mean of load over the last 6 visits (min 1).
    pub load_mean6:    f64,
    /// Trailing rolling sample std of load; 0.0 for a single observation.
    pub load_std6:     f64,
}
