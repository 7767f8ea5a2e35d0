//! Order-independent summary statistics over `f64` samples.
//!
//! Inputs are sorted before anything is accumulated, so the result of every
//! function here does not depend on the order samples were collected in.

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = sorted(values).iter().sum();
    Some(sum / values.len() as f64)
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let sum_sq: f64 = sorted(values)
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum();
    Some((sum_sq / values.len() as f64).sqrt())
}

/// Percentile with linear interpolation between closest ranks.
/// `pct` is in `[0, 100]`.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    Some(percentile_of_sorted(&sorted, pct))
}

pub fn percentile_of_sorted(sorted: &[f64], pct: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
