//! The feature-building pipeline: filter → coerce → aggregate → join → derive.
//!
//! All derived sequential features (inter-visit interval, generation rate,
//! rolling load statistics) are computed per service-point group after an
//! explicit stable sort on (service point, date).  The builder never relies
//! on any ordering of the raw inputs.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use ww_core::stats::rolling_mean_std;
use ww_core::{GeoPoint, SpId};

use crate::error::{FeatureError, FeatureResult};
use crate::record::{CapacityRecord, GeoRecord, RawVisitRecord};
use crate::table::VisitFeatureRow;

/// Material category marking a weight-measured collection event.  Rows whose
/// material does not contain this substring are excluded before aggregation.
pub const WEIGHT_MATERIAL: &str = "Bag Weight";

/// Trailing window length for the rolling load statistics.
pub const ROLLING_WINDOW: usize = 6;

/// Data-quality exclusion counts for one builder run.
///
/// Exclusions are not errors; these counts exist so a run can report how
/// much input it silently discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Raw visit rows seen.
    pub raw_visits:          usize,
    /// Rows excluded by the material filter.
    pub excluded_material:   usize,
    /// (service point, day) rows dropped for lack of a positive capacity.
    pub dropped_no_capacity: usize,
    /// Rows in the output table.
    pub rows:                usize,
}

/// Build the per-visit feature table from the three normalized inputs.
///
/// Returns the table sorted by (service point, date) ascending, plus the
/// exclusion counts.  An empty result is valid — downstream stages must
/// tolerate zero rows.
pub fn build_features(
    visits:   &[RawVisitRecord],
    capacity: &[CapacityRecord],
    geo:      &[GeoRecord],
) -> FeatureResult<(Vec<VisitFeatureRow>, BuildStats)> {
    let mut stats = BuildStats {
        raw_visits: visits.len(),
        ..BuildStats::default()
    };

    // ── Filter, coerce, and aggregate visits by (service point, day) ──────
    // The material filter runs before coercion: a malformed date or load on
    // a non-qualifying row must not fail the run.
    let mut daily_load: FxHashMap<(SpId, NaiveDate), f64> = FxHashMap::default();

    for rec in visits {
        if !rec.material.contains(WEIGHT_MATERIAL) {
            stats.excluded_material += 1;
            continue;
        }

        let day = parse_day(&rec.visit_date)?;
        let load = parse_load(&rec.load_kg)?;

        *daily_load
            .entry((SpId(rec.service_point.clone()), day))
            .or_insert(0.0) += load;
    }

    // ── Aggregate capacity per service point ──────────────────────────────
    let mut total_capacity: FxHashMap<&SpId, f64> = FxHashMap::default();
    for rec in capacity {
        *total_capacity.entry(&rec.service_point).or_insert(0.0) += rec.capacity_kg;
    }

    // First geo entry per service point wins.
    let mut coords: FxHashMap<&SpId, GeoPoint> = FxHashMap::default();
    for rec in geo {
        coords.entry(&rec.service_point).or_insert(rec.geo);
    }

    // ── Join: capacity mandatory, geo optional ────────────────────────────
    let mut rows: Vec<VisitFeatureRow> = Vec::with_capacity(daily_load.len());

    for ((sp, day), load_kg) in daily_load {
        // Capacity must resolve and be positive: a zero or negative total
        // would make fill_ratio non-finite and poison the model inputs.
        let Some(&capacity_kg) = total_capacity.get(&sp).filter(|&&c| c > 0.0) else {
            stats.dropped_no_capacity += 1;
            continue;
        };

        let geo = coords.get(&sp).copied();
        rows.push(VisitFeatureRow {
            fill_ratio: load_kg / capacity_kg,
            service_point: sp,
            visit_date: day,
            load_kg,
            capacity_kg,
            geo,
            interval_days: None,
            gen_rate: None,
            load_mean6: 0.0,
            load_std6: 0.0,
        });
    }

    // Strict sort key for all per-group sequential computation.
    rows.sort_by(|a, b| {
        (&a.service_point, a.visit_date).cmp(&(&b.service_point, b.visit_date))
    });

    // ── Per-group derived features ────────────────────────────────────────
    let mut start = 0;
    while start < rows.len() {
        let sp = rows[start].service_point.clone();
        let mut end = start + 1;
        while end < rows.len() && rows[end].service_point == sp {
            end += 1;
        }
        derive_group(&mut rows[start..end]);
        start = end;
    }

    stats.rows = rows.len();
    tracing::info!(
        raw_visits = stats.raw_visits,
        excluded_material = stats.excluded_material,
        dropped_no_capacity = stats.dropped_no_capacity,
        rows = stats.rows,
        "feature table built"
    );

    Ok((rows, stats))
}

/// Fill interval, generation rate, and rolling stats for one time-ordered
/// service-point group.
fn derive_group(group: &mut [VisitFeatureRow]) {
    for i in 1..group.len() {
        let gap = (group[i].visit_date - group[i - 1].visit_date).num_days();
        // Same-day duplicates should have collapsed during aggregation; a
        // zero gap is still treated as null to keep gen_rate division-safe.
        if gap > 0 {
            group[i].interval_days = Some(gap as f64);
            group[i].gen_rate = Some(group[i].load_kg / gap as f64);
        }
    }

    let loads: Vec<f64> = group.iter().map(|r| r.load_kg).collect();
    for (row, (m, s)) in group.iter_mut().zip(rolling_mean_std(&loads, ROLLING_WINDOW)) {
        row.load_mean6 = m;
        row.load_std6 = s;
    }
}

// ── Coercion helpers ──────────────────────────────────────────────────────────

/// Parse a date string, truncating any time-of-day component to the calendar
/// day.  Accepts `YYYY-MM-DD` and common datetime renderings of it.
fn parse_day(value: &str) -> FeatureResult<NaiveDate> {
    let s = value.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(FeatureError::Coerce {
        table:    "visits",
        column:   "visit_date",
        value:    value.to_owned(),
        expected: "a calendar date",
    })
}

fn parse_load(value: &str) -> FeatureResult<f64> {
    value.trim().parse::<f64>().map_err(|_| FeatureError::Coerce {
        table:    "visits",
        column:   "load_kg",
        value:    value.to_owned(),
        expected: "a number",
    })
}
