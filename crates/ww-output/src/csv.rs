//! CSV output backend — the dashboard contract.
//!
//! Creates two files:
//! - `visit_scores.csv`: one row per scored visit.
//! - `sp_metrics.csv`: one row per service point, headers exactly as the
//!   presentation layer expects them.
//!
//! Null cells (missing coordinates, undefined rate metrics) serialize as
//! empty fields; non-finite values never reach the file — aggregation
//! normalizes them to null first.

use std::path::Path;

use ww_anomaly::{SpMetricRow, VisitScoreRow};

use crate::atomic::{atomic_write, atomic_write_pair};
use crate::error::OutputResult;

/// Header of `visit_scores.csv`.
pub const VISIT_SCORE_HEADER: [&str; 15] = [
    "service_point",
    "visit_date",
    "V_kg",
    "capacity_kg",
    "lat",
    "lon",
    "V_fill",
    "VI",
    "GR",
    "V_kg_mean",
    "V_kg_std",
    "inv_fill",
    "abs_z_fill",
    "anomaly_score",
    "is_anomaly",
];

/// Header of `sp_metrics.csv`.
pub const SP_METRIC_HEADER: [&str; 15] = [
    "Service Point",
    "Visit Count",
    "Max Anomaly Score",
    "lat",
    "lon",
    "CAIv Ratio",
    "VOF %",
    "VUR %",
    "CVv Ratio",
    "PMRv Ratio",
    "GR p90 (kg/day)",
    "DtO (days)",
    "IG (days)",
    "CVgr Ratio",
    "Anomaly State",
];

/// Write the visit-level scored table to `path` (atomically).
pub fn write_visit_scores(path: &Path, rows: &[VisitScoreRow]) -> OutputResult<()> {
    atomic_write(path, |tmp| visit_scores_to(tmp, rows))?;
    tracing::info!(rows = rows.len(), path = %path.display(), "visit scores written");
    Ok(())
}

/// Write the service-point metrics table to `path` (atomically).
pub fn write_sp_metrics(path: &Path, rows: &[SpMetricRow]) -> OutputResult<()> {
    atomic_write(path, |tmp| sp_metrics_to(tmp, rows))?;
    tracing::info!(rows = rows.len(), path = %path.display(), "service-point metrics written");
    Ok(())
}

/// Write both score-stage tables as one all-or-nothing unit.
///
/// The scoring stage produces two files; if either write fails, neither
/// path is persisted.
pub fn write_score_tables(
    visit_path: &Path,
    visit_rows: &[VisitScoreRow],
    sp_path:    &Path,
    sp_rows:    &[SpMetricRow],
) -> OutputResult<()> {
    atomic_write_pair(
        visit_path,
        |tmp| visit_scores_to(tmp, visit_rows),
        sp_path,
        |tmp| sp_metrics_to(tmp, sp_rows),
    )?;
    tracing::info!(
        visits = visit_rows.len(),
        points = sp_rows.len(),
        visit_path = %visit_path.display(),
        sp_path = %sp_path.display(),
        "score tables written"
    );
    Ok(())
}

fn visit_scores_to(path: &Path, rows: &[VisitScoreRow]) -> OutputResult<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(VISIT_SCORE_HEADER)?;
    for row in rows {
        let f = &row.features;
        w.write_record(&[
            f.service_point.to_string(),
            f.visit_date.to_string(),
            f.load_kg.to_string(),
            f.capacity_kg.to_string(),
            cell(f.geo.map(|g| g.lat)),
            cell(f.geo.map(|g| g.lon)),
            f.fill_ratio.to_string(),
            cell(f.interval_days),
            cell(f.gen_rate),
            f.load_mean6.to_string(),
            f.load_std6.to_string(),
            row.inv_fill.to_string(),
            row.abs_z_fill.to_string(),
            row.anomaly_score.to_string(),
            (row.is_anomaly as u8).to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn sp_metrics_to(path: &Path, rows: &[SpMetricRow]) -> OutputResult<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(SP_METRIC_HEADER)?;
    for row in rows {
        w.write_record(&[
            row.service_point.to_string(),
            row.visit_count.to_string(),
            row.max_score.to_string(),
            cell(row.geo.map(|g| g.lat)),
            cell(row.geo.map(|g| g.lon)),
            row.caiv_ratio.to_string(),
            row.vof_pct.to_string(),
            row.vur_pct.to_string(),
            cell(row.cvv_ratio),
            cell(row.pmrv_ratio),
            cell(row.gr_p90),
            cell(row.days_to_overflow),
            cell(row.max_interval),
            cell(row.cvgr_ratio),
            (if row.anomalous { "Yes" } else { "No" }).to_owned(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Null → empty field.
fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
