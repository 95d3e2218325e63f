//! Per-service-point risk metrics.
//!
//! Each metric is a deterministic aggregate over one point's scored visits.
//! The point-level anomaly state uses its own contamination quantile over
//! per-point maximum scores — deliberately independent of the visit-level
//! cutoff, so the two act as separate risk signals.

use ww_core::stats::{mean, median, quantile, sample_std};
use ww_core::{GeoPoint, SpId};

use crate::engine::VisitScoreRow;

/// One service point's aggregated risk row.
///
/// Ratio metrics over generation rate and interval skip null observations;
/// they are `None` when a point has no qualifying observations at all (e.g.
/// a single-visit point has no intervals).  The coefficient-of-variation
/// metrics need at least two observations and are `None` below that.
/// Non-finite ratios (division by a zero aggregate) are normalized to
/// `None` rather than emitted as NaN/inf.
#[derive(Debug, Clone, PartialEq)]
pub struct SpMetricRow {
    pub service_point:   SpId,
    pub visit_count:     usize,
    pub max_score:       f64,
    /// First observed coordinates, pass-through for the dashboard.
    pub geo:             Option<GeoPoint>,
    /// Capacity-alignment: p90 of daily load ÷ capacity.
    pub caiv_ratio:      f64,
    /// Visit-overflow frequency: % of visits with fill ratio > 1.
    pub vof_pct:         f64,
    /// Mean utilization: mean fill ratio × 100.
    pub vur_pct:         f64,
    /// Coefficient of variation of daily load.
    pub cvv_ratio:       Option<f64>,
    /// Peak-to-mean daily load.
    pub pmrv_ratio:      Option<f64>,
    /// 90th-percentile generation rate, kg/day.
    pub gr_p90:          Option<f64>,
    /// Estimated days to overflow: capacity ÷ median generation rate.
    pub days_to_overflow: Option<f64>,
    /// Longest observed inter-visit gap, days.
    pub max_interval:    Option<f64>,
    /// Coefficient of variation of generation rate.
    pub cvgr_ratio:      Option<f64>,
    /// Point-level anomaly state ("Yes" in the persisted table).
    pub anomalous:       bool,
}

/// Aggregate scored visits into one row per service point and derive the
/// point-level anomaly state.
///
/// `rows` must be grouped by service point (the feature builder's sort
/// order guarantees this).  Output preserves that order.
pub fn build_sp_metrics(rows: &[VisitScoreRow], contamination: f64) -> Vec<SpMetricRow> {
    let mut out: Vec<SpMetricRow> = Vec::new();

    let mut start = 0;
    while start < rows.len() {
        let sp = &rows[start].features.service_point;
        let mut end = start + 1;
        while end < rows.len() && rows[end].features.service_point == *sp {
            end += 1;
        }
        out.push(aggregate_group(&rows[start..end]));
        start = end;
    }

    // Second, independent contamination cutoff over per-point max scores.
    let max_scores: Vec<f64> = out.iter().map(|r| r.max_score).collect();
    if let Some(cutoff) = quantile(&max_scores, 1.0 - contamination) {
        for row in &mut out {
            row.anomalous = row.max_score >= cutoff;
        }
        tracing::info!(
            points = out.len(),
            flagged = out.iter().filter(|r| r.anomalous).count(),
            cutoff,
            "service-point metrics built"
        );
    }

    out
}

fn aggregate_group(group: &[VisitScoreRow]) -> SpMetricRow {
    let loads: Vec<f64> = group.iter().map(|r| r.features.load_kg).collect();
    let fills: Vec<f64> = group.iter().map(|r| r.features.fill_ratio).collect();
    let rates: Vec<f64> = group.iter().filter_map(|r| r.features.gen_rate).collect();
    let gaps: Vec<f64> = group.iter().filter_map(|r| r.features.interval_days).collect();

    let capacity = group[0].features.capacity_kg;
    let load_mean = mean(&loads).unwrap_or(0.0);
    let max_score = group
        .iter()
        .map(|r| r.anomaly_score)
        .fold(f64::NEG_INFINITY, f64::max);

    SpMetricRow {
        service_point: group[0].features.service_point.clone(),
        visit_count:   group.len(),
        max_score,
        geo:           group.iter().find_map(|r| r.features.geo),
        caiv_ratio:    quantile(&loads, 0.90).unwrap_or(0.0) / capacity,
        vof_pct:       100.0 * fills.iter().filter(|&&f| f > 1.0).count() as f64
            / fills.len() as f64,
        vur_pct:       100.0 * mean(&fills).unwrap_or(0.0),
        cvv_ratio:     cv(&loads),
        pmrv_ratio:    ratio(
            Some(loads.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))),
            Some(load_mean),
        ),
        gr_p90:        quantile(&rates, 0.90),
        days_to_overflow: ratio(Some(capacity), median(&rates)),
        max_interval:  gaps
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, g| Some(acc.map_or(g, |a| a.max(g)))),
        cvgr_ratio:    cv(&rates),
        anomalous:     false, // set by the caller's point-level cutoff
    }
}

/// Coefficient of variation.  A spread needs at least two observations, so
/// a single value (or none) yields a null cell, not 0.
fn cv(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    ratio(sample_std(values), mean(values))
}

/// `num / den`, normalized to `None` when either side is missing or the
/// result is non-finite.
fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let v = num? / den?;
    v.is_finite().then_some(v)
}
