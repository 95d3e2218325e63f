//! Shared numeric statistics.
//!
//! Conventions, fixed once here so every stage agrees:
//!
//! - Standard deviation is the *sample* std (n − 1 denominator), and is
//!   defined as 0.0 for fewer than two observations rather than NaN.
//! - Quantiles use linear interpolation between order statistics
//!   (`h = (n − 1) · q`), matching the calibration semantics the anomaly
//!   thresholds were tuned against.
//! - Aggregates over empty inputs return `None`; callers decide whether an
//!   empty group is an error or a null cell.

/// Arithmetic mean.  `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1).  0.0 for fewer than two observations,
/// `None` only for an empty slice.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Linearly interpolated quantile, `q` in [0, 1].  `None` for an empty slice.
///
/// Sorts a copy of the input; fine at this pipeline's row counts.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64))
}

/// Median — the 0.5 quantile.
#[inline]
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Trailing rolling mean and sample std over the last `window` observations
/// (including the current one), minimum one observation.
///
/// Output is positionally aligned with the input: `out[i]` covers
/// `values[i.saturating_sub(window - 1) ..= i]`.  The std of a single
/// observation is 0.0.
pub fn rolling_mean_std(values: &[f64], window: usize) -> Vec<(f64, f64)> {
    assert!(window >= 1, "rolling window must be at least 1");

    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        let slice = &values[start..=i];
        // Both unwraps are safe: the slice always holds at least one value.
        let m = mean(slice).unwrap();
        let s = sample_std(slice).unwrap();
        out.push((m, s));
    }
    out
}
