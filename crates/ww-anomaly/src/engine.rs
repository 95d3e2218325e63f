//! Visit-level scoring: symmetric features, median imputation, fit, and
//! contamination-calibrated flagging.

use ww_core::stats::{mean, quantile, sample_std};
use ww_core::RunRng;

use ww_features::VisitFeatureRow;

use crate::error::{AnomalyError, AnomalyResult};
use crate::forest::IsolationForest;

// ── Parameters ────────────────────────────────────────────────────────────────

/// Run parameters for the anomaly engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineParams {
    /// Expected fraction of anomalous visits, in (0, 1).  Directly controls
    /// what fraction of visits is flagged.
    pub contamination: f64,
    /// Number of isolation trees.
    pub n_estimators:  usize,
    /// Root seed for all random sampling.
    pub seed:          u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self { contamination: 0.05, n_estimators: 400, seed: 42 }
    }
}

impl EngineParams {
    /// Validate before any data is processed.
    pub fn validate(&self) -> AnomalyResult<()> {
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(AnomalyError::Config(format!(
                "contamination must be in (0, 1), got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(AnomalyError::Config("n_estimators must be positive".into()));
        }
        Ok(())
    }
}

// ── Output rows ───────────────────────────────────────────────────────────────

/// A visit feature row plus symmetric features and its model verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitScoreRow {
    pub features:      VisitFeatureRow,
    /// `1 − fill_ratio`; makes under-utilization as visible as overflow.
    pub inv_fill:      f64,
    /// |z-score| of the fill ratio over the whole visit population.
    pub abs_z_fill:    f64,
    pub anomaly_score: f64,
    pub is_anomaly:    bool,
}

/// The scored table plus the cutoff it was flagged against.
#[derive(Debug, Clone)]
pub struct ScoredVisits {
    pub rows:      Vec<VisitScoreRow>,
    /// `(1 − contamination)` quantile of this run's score distribution.
    pub threshold: f64,
}

// ── Scoring ───────────────────────────────────────────────────────────────────

/// Fit the forest over the feature table and flag anomalous visits.
///
/// The model sees every numeric column (load, capacity, coordinates, fill
/// ratio, interval, generation rate, rolling stats) plus the two symmetric
/// fill features.  Missing values are imputed with per-column medians
/// computed once over the whole table.
pub fn score_visits(
    table:  &[VisitFeatureRow],
    params: &EngineParams,
) -> AnomalyResult<ScoredVisits> {
    params.validate()?;
    if table.is_empty() {
        return Err(AnomalyError::EmptyInput);
    }

    let (inv_fill, abs_z_fill) = symmetric_features(table);
    let data = feature_matrix(table, &inv_fill, &abs_z_fill);

    let forest = IsolationForest::fit(&data, params.n_estimators, RunRng::new(params.seed));
    let scores = forest.score_all(&data);

    // Both passes over the score column happen before any row-level verdict;
    // the cutoff is a batch statistic, not a streaming estimate.
    let threshold = quantile(&scores, 1.0 - params.contamination)
        .expect("score vector is non-empty");

    let rows = table
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(i, (feat, anomaly_score))| VisitScoreRow {
            features:   feat.clone(),
            inv_fill:   inv_fill[i],
            abs_z_fill: abs_z_fill[i],
            anomaly_score,
            is_anomaly: anomaly_score >= threshold,
        })
        .collect::<Vec<_>>();

    let flagged = rows.iter().filter(|r| r.is_anomaly).count();
    tracing::info!(
        visits = rows.len(),
        flagged,
        threshold,
        contamination = params.contamination,
        "visit scoring complete"
    );

    Ok(ScoredVisits { rows, threshold })
}

/// Population-level symmetric fill features.
///
/// A degenerate fill distribution (zero or undefined std) yields 0.0 for
/// every |z|, never NaN.
fn symmetric_features(table: &[VisitFeatureRow]) -> (Vec<f64>, Vec<f64>) {
    let fills: Vec<f64> = table.iter().map(|r| r.fill_ratio).collect();
    let m = mean(&fills).unwrap_or(0.0);
    let s = sample_std(&fills).unwrap_or(0.0);

    let inv_fill: Vec<f64> = fills.iter().map(|f| 1.0 - f).collect();
    let abs_z: Vec<f64> = fills
        .iter()
        .map(|f| {
            if s > 0.0 {
                let z = ((f - m) / s).abs();
                if z.is_finite() { z } else { 0.0 }
            } else {
                0.0
            }
        })
        .collect();

    (inv_fill, abs_z)
}

/// Assemble the model input matrix, median-imputing missing cells.
fn feature_matrix(
    table:      &[VisitFeatureRow],
    inv_fill:   &[f64],
    abs_z_fill: &[f64],
) -> Vec<Vec<f64>> {
    let columns: Vec<Vec<Option<f64>>> = vec![
        table.iter().map(|r| Some(r.load_kg)).collect(),
        table.iter().map(|r| Some(r.capacity_kg)).collect(),
        table.iter().map(|r| r.geo.map(|g| g.lat)).collect(),
        table.iter().map(|r| r.geo.map(|g| g.lon)).collect(),
        table.iter().map(|r| Some(r.fill_ratio)).collect(),
        table.iter().map(|r| r.interval_days).collect(),
        table.iter().map(|r| r.gen_rate).collect(),
        table.iter().map(|r| Some(r.load_mean6)).collect(),
        table.iter().map(|r| Some(r.load_std6)).collect(),
        inv_fill.iter().map(|&v| Some(v)).collect(),
        abs_z_fill.iter().map(|&v| Some(v)).collect(),
    ];

    // One imputation value per column, computed over the full table.
    let fills: Vec<f64> = columns.iter().map(|col| impute_value(col)).collect();

    (0..table.len())
        .map(|row| {
            columns
                .iter()
                .zip(&fills)
                .map(|(col, &fill)| col[row].unwrap_or(fill))
                .collect()
        })
        .collect()
}

/// Median of the column's present values; 0.0 if the column is entirely null.
fn impute_value(column: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = column.iter().flatten().copied().collect();
    ww_core::stats::median(&present).unwrap_or(0.0)
}
