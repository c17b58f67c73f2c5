//! Season baseline statistics
//!
//! The baseline is computed over the entire series, never a recent slice:
//! it is the primary anchor every projection starts from.

use crate::domain::BaselineStatistics;
use crate::error::{PropsightError, Result};

/// Compute mean, median, sample standard deviation and the 10th/90th
/// percentile band of a value series.
pub fn calculate_baseline(values: &[f64]) -> Result<BaselineStatistics> {
    if values.is_empty() {
        return Err(PropsightError::InsufficientData(
            "cannot compute a baseline from an empty value series".into(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(BaselineStatistics {
        mean: mean(values),
        median: percentile(&sorted, 50.0),
        std_dev: sample_std_dev(values),
        floor: percentile(&sorted, 10.0),
        ceiling: percentile(&sorted, 90.0),
        sample_size: values.len(),
    })
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 when n < 2
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Percentile of pre-sorted values using linear interpolation between
/// closest ranks: rank = p/100 × (n - 1)
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Mean of the last `window` values (all values when the series is shorter)
pub fn tail_mean(values: &[f64], window: usize) -> f64 {
    let take = window.min(values.len());
    mean(&values[values.len() - take..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let err = calculate_baseline(&[]).unwrap_err();
        assert!(matches!(err, PropsightError::InsufficientData(_)));
    }

    #[test]
    fn test_single_value_has_zero_std_dev() {
        let baseline = calculate_baseline(&[14.0]).unwrap();
        assert_eq!(baseline.mean, 14.0);
        assert_eq!(baseline.median, 14.0);
        assert_eq!(baseline.std_dev, 0.0);
        assert_eq!(baseline.floor, 14.0);
        assert_eq!(baseline.ceiling, 14.0);
        assert_eq!(baseline.sample_size, 1);
    }

    #[test]
    fn test_baseline_uses_whole_series() {
        let values = [10.0, 12.0, 9.0, 11.0, 50.0];
        let baseline = calculate_baseline(&values).unwrap();

        assert!(approx(baseline.mean, 18.4));
        assert!(approx(baseline.median, 11.0));
        // sum of squared deviations 1253.2 / 4
        assert!(approx(baseline.std_dev, 313.3_f64.sqrt()));
        // sorted [9, 10, 11, 12, 50]; rank 0.4 and 3.6
        assert!(approx(baseline.floor, 9.4));
        assert!(approx(baseline.ceiling, 34.8));
        assert_eq!(baseline.sample_size, 5);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(percentile(&sorted, 50.0), 2.5));
        assert!(approx(percentile(&sorted, 0.0), 1.0));
        assert!(approx(percentile(&sorted, 100.0), 4.0));
        assert!(approx(percentile(&sorted, 10.0), 1.3));
    }

    #[test]
    fn test_unsorted_input_is_order_independent_for_band() {
        let a = calculate_baseline(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        let b = calculate_baseline(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tail_mean_clamps_window() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(tail_mean(&values, 2), 3.5));
        assert!(approx(tail_mean(&values, 10), 2.5));
    }
}
