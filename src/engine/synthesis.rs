//! Weighted synthesis, edge, recommendation and confidence
//!
//! final = mean × w_baseline + adjusted_recent × w_recent + trend × w_trend
//!       + mean × w_remainder
//!
//! where w_remainder = 1 - w_baseline - w_recent - w_trend. The historical
//! matchup and defensive tier weights are not computed as separate signals;
//! they land in the remainder and therefore on the baseline.

use crate::config::{EngineConfig, WeightingConfig};
use crate::domain::{BaselineStatistics, ConfidenceLevel, Recommendation, WeightsApplied};

pub fn synthesize_projection(
    baseline: &BaselineStatistics,
    adjusted_recent: f64,
    trend_mean: f64,
    weights: &WeightingConfig,
) -> (f64, WeightsApplied) {
    let applied = WeightsApplied {
        baseline: weights.baseline,
        recent: weights.recent_form,
        trend: weights.trend,
        remainder: weights.remainder(),
    };

    let projection = baseline.mean * applied.baseline
        + adjusted_recent * applied.recent
        + trend_mean * applied.trend
        + baseline.mean * applied.remainder;

    (projection, applied)
}

/// Percentage deviation of the projection from the line; 0 when line <= 0
pub fn edge_percent(projection: f64, line: f64) -> f64 {
    if line > 0.0 {
        (projection - line) / line * 100.0
    } else {
        0.0
    }
}

/// OVER/UNDER outside the ±threshold dead zone; the boundary itself is neutral
pub fn recommend(edge_percent: f64, edge_threshold: f64) -> Option<Recommendation> {
    if edge_percent > edge_threshold {
        Some(Recommendation::Over)
    } else if edge_percent < -edge_threshold {
        Some(Recommendation::Under)
    } else {
        None
    }
}

/// Confidence ladder, first match wins:
/// 1. too few samples -> INSUFFICIENT
/// 2. outlier recent form or small edge -> LOW
/// 3. enough samples and large edge -> HIGH
/// 4. MEDIUM
pub fn assess_confidence(
    sample_size: usize,
    edge_percent: f64,
    is_outlier: bool,
    config: &EngineConfig,
) -> ConfidenceLevel {
    let edge = edge_percent.abs();

    if sample_size < config.min_sample_size {
        return ConfidenceLevel::Insufficient;
    }
    if is_outlier || edge < config.low_edge_threshold {
        return ConfidenceLevel::Low;
    }
    if sample_size >= config.high_confidence_sample_size && edge > config.high_edge_threshold {
        return ConfidenceLevel::High;
    }
    ConfidenceLevel::Medium
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(mean: f64) -> BaselineStatistics {
        BaselineStatistics {
            mean,
            median: mean,
            std_dev: 2.0,
            floor: mean - 3.0,
            ceiling: mean + 3.0,
            sample_size: 12,
        }
    }

    #[test]
    fn test_remainder_folds_into_baseline() {
        let weights = WeightingConfig::default();
        let (projection, applied) = synthesize_projection(&baseline(20.0), 30.0, 10.0, &weights);

        assert!((applied.total() - 1.0).abs() < 1e-9);
        assert!((applied.remainder - 0.27).abs() < 1e-9);
        // 20 × 0.82 + 30 × 0.13 + 10 × 0.05
        assert!((projection - (16.4 + 3.9 + 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_matchup_and_tier_split_does_not_move_projection() {
        let default_weights = WeightingConfig::default();
        let shifted = WeightingConfig {
            historical_matchup: 0.05,
            defensive_tier: 0.22,
            ..WeightingConfig::default()
        };

        let (a, _) = synthesize_projection(&baseline(20.0), 24.0, 26.0, &default_weights);
        let (b, _) = synthesize_projection(&baseline(20.0), 24.0, 26.0, &shifted);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_flat_signals_reproduce_baseline() {
        let (projection, _) =
            synthesize_projection(&baseline(17.5), 17.5, 17.5, &WeightingConfig::default());
        assert!((projection - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_edge_guards_non_positive_line() {
        assert_eq!(edge_percent(25.0, 0.0), 0.0);
        assert_eq!(edge_percent(25.0, -3.5), 0.0);
        assert_eq!(edge_percent(f64::MAX, 0.0), 0.0);
        assert!((edge_percent(22.0, 20.0) - 10.0).abs() < 1e-9);
        assert!((edge_percent(18.0, 20.0) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_recommendation_dead_zone() {
        assert_eq!(recommend(5.0, 5.0), None);
        assert_eq!(recommend(-5.0, 5.0), None);
        assert_eq!(recommend(0.0, 5.0), None);
        assert_eq!(recommend(5.0001, 5.0), Some(Recommendation::Over));
        assert_eq!(recommend(-5.0001, 5.0), Some(Recommendation::Under));
    }

    #[test]
    fn test_confidence_ladder_precedence() {
        let config = EngineConfig::default();

        // sample size beats everything
        assert_eq!(assess_confidence(4, 50.0, false, &config), ConfidenceLevel::Insufficient);
        assert_eq!(assess_confidence(4, 1.0, true, &config), ConfidenceLevel::Insufficient);
        // outlier beats a large edge
        assert_eq!(assess_confidence(20, 50.0, true, &config), ConfidenceLevel::Low);
        // small edge
        assert_eq!(assess_confidence(20, 2.9, false, &config), ConfidenceLevel::Low);
        assert_eq!(assess_confidence(20, -2.9, false, &config), ConfidenceLevel::Low);
        // high needs both sample size and edge
        assert_eq!(assess_confidence(10, 8.1, false, &config), ConfidenceLevel::High);
        assert_eq!(assess_confidence(10, -8.1, false, &config), ConfidenceLevel::High);
        assert_eq!(assess_confidence(9, 30.0, false, &config), ConfidenceLevel::Medium);
        assert_eq!(assess_confidence(10, 8.0, false, &config), ConfidenceLevel::Medium);
        assert_eq!(assess_confidence(5, 3.0, false, &config), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_never_high_without_samples_and_edge() {
        let config = EngineConfig::default();
        for sample_size in 0..15 {
            for tenth in -150..150 {
                let edge = tenth as f64 / 10.0;
                for outlier in [false, true] {
                    let level = assess_confidence(sample_size, edge, outlier, &config);
                    if sample_size < 10 || edge.abs() <= 8.0 || outlier {
                        assert_ne!(level, ConfidenceLevel::High, "n={sample_size} edge={edge}");
                    }
                }
            }
        }
    }
}
