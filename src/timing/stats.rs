//! Rolling lap statistics.
//!
//! Every function here is a pure function of the accepted lap-time
//! sequence, so any statistic can be re-derived exactly from history.
//! The store recomputes after each accepted lap; "is this a new best"
//! falls out of comparing `best_lap` before and after.

use crate::defaults::MOVING_AVG_WINDOW;

/// Minimum over all accepted laps, or None when no lap exists.
///
/// Monotonically non-increasing over the lap sequence.
pub fn best_lap(lap_times: &[f64]) -> Option<f64> {
    lap_times.iter().copied().fold(None, |acc, t| match acc {
        Some(best) if best <= t => Some(best),
        _ => Some(t),
    })
}

/// Arithmetic mean of the last `min(N, 10)` accepted laps.
pub fn moving_avg_10(lap_times: &[f64]) -> f64 {
    let window = &lap_times[lap_times.len().saturating_sub(MOVING_AVG_WINDOW)..];
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Population standard deviation over all accepted laps.
///
/// 0.0 when fewer than 2 laps exist.
pub fn std_dev(lap_times: &[f64]) -> f64 {
    if lap_times.len() < 2 {
        return 0.0;
    }
    let n = lap_times.len() as f64;
    let mean = lap_times.iter().sum::<f64>() / n;
    let variance = lap_times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
