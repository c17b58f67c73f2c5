//! Recency bias detection
//!
//! Recent form is trusted only when it is not a statistical anomaly against
//! season-long behavior. An outlying recent window is fully regressed to the
//! baseline mean.

use serde::{Deserialize, Serialize};

use super::baseline::tail_mean;
use crate::domain::BaselineStatistics;

/// Outcome of checking the recent window against the baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyAssessment {
    pub recent_mean: f64,
    pub z_score: f64,
    pub is_outlier: bool,
    /// Recent mean, or the baseline mean when the recent window is an outlier
    pub adjusted_recent: f64,
}

/// |recent_mean - baseline.mean| / baseline.std_dev, or 0 without spread
pub fn z_score(recent_mean: f64, baseline: &BaselineStatistics) -> f64 {
    if baseline.std_dev > 0.0 {
        (recent_mean - baseline.mean).abs() / baseline.std_dev
    } else {
        0.0
    }
}

pub fn assess_recency(
    values: &[f64],
    baseline: &BaselineStatistics,
    recent_window: usize,
    outlier_threshold: f64,
) -> RecencyAssessment {
    let recent_mean = tail_mean(values, recent_window);
    let z = z_score(recent_mean, baseline);
    let is_outlier = z > outlier_threshold;

    RecencyAssessment {
        recent_mean,
        z_score: z,
        is_outlier,
        adjusted_recent: if is_outlier { baseline.mean } else { recent_mean },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::baseline::calculate_baseline;

    #[test]
    fn test_full_window_matches_baseline() {
        let values = [10.0, 12.0, 9.0, 11.0, 50.0];
        let baseline = calculate_baseline(&values).unwrap();
        let assessment = assess_recency(&values, &baseline, 5, 2.0);

        assert!((assessment.recent_mean - 18.4).abs() < 1e-9);
        assert!(assessment.z_score.abs() < 1e-9);
        assert!(!assessment.is_outlier);
        assert_eq!(assessment.adjusted_recent, assessment.recent_mean);
    }

    #[test]
    fn test_single_game_spike_stays_below_threshold() {
        let values = [10.0, 12.0, 9.0, 11.0, 50.0];
        let baseline = calculate_baseline(&values).unwrap();
        let assessment = assess_recency(&values, &baseline, 1, 2.0);

        assert_eq!(assessment.recent_mean, 50.0);
        // 31.6 / sqrt(313.3)
        assert!((assessment.z_score - 1.785).abs() < 0.01);
        assert!(!assessment.is_outlier);
        assert_eq!(assessment.adjusted_recent, 50.0);
    }

    #[test]
    fn test_outlier_regresses_to_baseline() {
        let mut values = vec![20.0, 21.0, 19.0, 20.0, 22.0, 18.0, 20.0, 21.0, 19.0, 20.0];
        values.extend([20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 34.0]);
        let baseline = calculate_baseline(&values).unwrap();
        let assessment = assess_recency(&values, &baseline, 1, 2.0);

        assert!(assessment.z_score > 2.0);
        assert!(assessment.is_outlier);
        assert_eq!(assessment.adjusted_recent, baseline.mean);
    }

    #[test]
    fn test_zero_spread_is_never_an_outlier() {
        let values = [7.0; 6];
        let baseline = calculate_baseline(&values).unwrap();
        assert_eq!(baseline.std_dev, 0.0);

        let assessment = assess_recency(&values, &baseline, 3, 2.0);
        assert_eq!(assessment.z_score, 0.0);
        assert!(!assessment.is_outlier);
    }

    #[test]
    fn test_is_outlier_matches_definition() {
        let series: [&[f64]; 4] = [
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            &[30.0, 28.0, 31.0, 29.0, 30.0, 12.0, 10.0],
            &[5.0, 5.0, 5.0, 5.0, 5.0, 25.0],
            &[0.0, 100.0, 0.0, 100.0],
        ];

        for values in series {
            let baseline = calculate_baseline(values).unwrap();
            for window in 1..=values.len() {
                let assessment = assess_recency(values, &baseline, window, 2.0);
                let recent = tail_mean(values, window);
                let expected = baseline.std_dev > 0.0
                    && (recent - baseline.mean).abs() / baseline.std_dev > 2.0;
                assert_eq!(assessment.is_outlier, expected, "{values:?} window {window}");
            }
        }
    }
}
