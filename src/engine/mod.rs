//! Anti-Recency Engine
//!
//! Turns a historical value series into a single projection against a prop
//! line. The full-season baseline is the primary anchor; recent form only
//! moves the projection when it is not an outlier.
//!
//! The engine is a pure computation: no storage, no shared mutable state.
//! One instance can be shared across threads and analyses freely.

pub mod baseline;
pub mod recency;
pub mod synthesis;

pub use baseline::calculate_baseline;
pub use recency::{assess_recency, RecencyAssessment};

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::domain::{AnalyzePropRequest, WeightedProjection};
use crate::error::{PropsightError, Result};

#[derive(Debug, Clone)]
pub struct AntiRecencyEngine {
    config: EngineConfig,
}

impl Default for AntiRecencyEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

impl AntiRecencyEngine {
    /// Create an engine; rejects weight sets that do not sum to 1.0
    pub fn new(config: EngineConfig) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(PropsightError::Validation(errors.join("; ")));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze one prop.
    ///
    /// Fails with `InsufficientData` when `values` is empty and with
    /// `Validation` on malformed fields.
    pub fn analyze_prop(
        &self,
        subject_id: &str,
        metric_type: &str,
        line: f64,
        values: &[f64],
        opponent_tier: u8,
    ) -> Result<WeightedProjection> {
        let request = AnalyzePropRequest {
            subject_id: subject_id.to_string(),
            metric_type: metric_type.to_string(),
            line,
            values: values.to_vec(),
            opponent_tier,
        };
        self.analyze(&request)
    }

    pub fn analyze(&self, request: &AnalyzePropRequest) -> Result<WeightedProjection> {
        request.validate()?;
        let values = request.values.as_slice();

        let baseline = calculate_baseline(values)?;
        let recency = assess_recency(
            values,
            &baseline,
            self.config.recent_window,
            self.config.outlier_threshold,
        );
        let trend = baseline::tail_mean(values, self.config.trend_window);

        let (final_projection, weights_applied) = synthesis::synthesize_projection(
            &baseline,
            recency.adjusted_recent,
            trend,
            &self.config.weights,
        );
        let edge_percent = synthesis::edge_percent(final_projection, request.line);
        let recommendation = synthesis::recommend(edge_percent, self.config.edge_threshold);
        let confidence_level = synthesis::assess_confidence(
            baseline.sample_size,
            edge_percent,
            recency.is_outlier,
            &self.config,
        );

        if recency.is_outlier {
            debug!(
                subject = %request.subject_id,
                metric = %request.metric_type,
                z = recency.z_score,
                recent = recency.recent_mean,
                baseline = baseline.mean,
                "recent form is an outlier, regressing to baseline"
            );
        }

        debug!(
            subject = %request.subject_id,
            metric = %request.metric_type,
            projection = final_projection,
            edge = edge_percent,
            confidence = %confidence_level,
            "prop analyzed"
        );

        Ok(WeightedProjection {
            subject_id: request.subject_id.clone(),
            metric_type: request.metric_type.clone(),
            line: request.line,
            season_baseline: baseline.mean,
            final_projection,
            edge_percent,
            confidence_level,
            recommendation,
            floor: baseline.floor,
            ceiling: baseline.ceiling,
            weights_applied,
            opponent_tier: request.opponent_tier,
            recent_form: recency.adjusted_recent,
            trend,
            is_outlier: recency.is_outlier,
        })
    }

    /// Analyze many props. A failing item never aborts the batch; results are
    /// returned in request order.
    pub fn analyze_props_batch(
        &self,
        requests: &[AnalyzePropRequest],
    ) -> Vec<Result<WeightedProjection>> {
        requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                let result = self.analyze(request);
                if let Err(ref e) = result {
                    warn!(index, subject = %request.subject_id, "batch item failed: {}", e);
                }
                result
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightingConfig;
    use crate::domain::{ConfidenceLevel, Recommendation};

    fn season() -> Vec<f64> {
        vec![22.0, 25.0, 19.0, 24.0, 21.0, 26.0, 23.0, 20.0, 24.0, 22.0, 25.0, 23.0]
    }

    #[test]
    fn test_empty_series_fails() {
        let engine = AntiRecencyEngine::default();
        let err = engine.analyze_prop("p1", "points", 20.5, &[], 3).unwrap_err();
        assert!(matches!(err, PropsightError::InsufficientData(_)));
    }

    #[test]
    fn test_rejects_weights_not_summing_to_one() {
        let config = EngineConfig {
            weights: WeightingConfig {
                baseline: 0.7,
                ..WeightingConfig::default()
            },
            ..EngineConfig::default()
        };
        assert!(matches!(
            AntiRecencyEngine::new(config),
            Err(PropsightError::Validation(_))
        ));
    }

    #[test]
    fn test_over_with_high_confidence() {
        let engine = AntiRecencyEngine::default();
        let projection = engine.analyze_prop("p1", "points", 20.0, &season(), 3).unwrap();

        // mean 22.833…, recent (last 5) 22.8, trend (last 3) 23.333…
        assert!((projection.season_baseline - 274.0 / 12.0).abs() < 1e-9);
        assert!(!projection.is_outlier);
        assert!(projection.edge_percent > 8.0);
        assert_eq!(projection.recommendation, Some(Recommendation::Over));
        assert_eq!(projection.confidence_level, ConfidenceLevel::High);
        assert!((projection.weights_applied.total() - 1.0).abs() < 1e-9);
        assert!(projection.floor <= projection.season_baseline);
        assert!(projection.ceiling >= projection.season_baseline);
    }

    #[test]
    fn test_near_line_is_neutral_and_low() {
        let engine = AntiRecencyEngine::default();
        let projection = engine.analyze_prop("p1", "points", 22.9, &season(), 3).unwrap();

        assert!(projection.edge_percent.abs() < 3.0);
        assert_eq!(projection.recommendation, None);
        assert_eq!(projection.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_short_series_is_insufficient_even_with_edge() {
        let engine = AntiRecencyEngine::default();
        let projection = engine
            .analyze_prop("p1", "points", 10.0, &[20.0, 22.0, 21.0, 23.0], 3)
            .unwrap();

        assert_eq!(projection.recommendation, Some(Recommendation::Over));
        assert_eq!(projection.confidence_level, ConfidenceLevel::Insufficient);
    }

    #[test]
    fn test_zero_line_has_zero_edge() {
        let engine = AntiRecencyEngine::default();
        let projection = engine.analyze_prop("p1", "points", 0.0, &season(), 3).unwrap();

        assert_eq!(projection.edge_percent, 0.0);
        assert_eq!(projection.recommendation, None);
        assert_eq!(projection.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_opponent_tier_is_echoed_but_inert() {
        let engine = AntiRecencyEngine::default();
        let soft = engine.analyze_prop("p1", "points", 20.0, &season(), 5).unwrap();
        let tough = engine.analyze_prop("p1", "points", 20.0, &season(), 1).unwrap();

        assert_eq!(soft.opponent_tier, 5);
        assert_eq!(tough.opponent_tier, 1);
        assert_eq!(soft.final_projection, tough.final_projection);
    }

    #[test]
    fn test_window_choice_changes_recent_form() {
        let values = [10.0, 12.0, 9.0, 11.0, 50.0];

        let wide = AntiRecencyEngine::default()
            .analyze_prop("p1", "points", 15.0, &values, 3)
            .unwrap();
        assert!((wide.recent_form - 18.4).abs() < 1e-9);
        assert!(!wide.is_outlier);

        let narrow = AntiRecencyEngine::new(EngineConfig {
            recent_window: 1,
            ..EngineConfig::default()
        })
        .unwrap()
        .analyze_prop("p1", "points", 15.0, &values, 3)
        .unwrap();
        assert_eq!(narrow.recent_form, 50.0);
        assert!(!narrow.is_outlier);
        assert!(narrow.final_projection > wide.final_projection);
    }

    #[test]
    fn test_outlier_projection_is_low_confidence() {
        let mut values = vec![20.0; 19];
        values[3] = 21.0;
        values[7] = 19.0;
        values.push(40.0);

        let engine = AntiRecencyEngine::new(EngineConfig {
            recent_window: 1,
            ..EngineConfig::default()
        })
        .unwrap();
        let projection = engine.analyze_prop("p1", "points", 15.0, &values, 3).unwrap();

        assert!(projection.is_outlier);
        assert_eq!(projection.recent_form, projection.season_baseline);
        assert_eq!(projection.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let engine = AntiRecencyEngine::default();
        let requests = vec![
            AnalyzePropRequest::new("ok-1", "points", 20.0, season()),
            AnalyzePropRequest::new("empty", "points", 20.0, vec![]),
            AnalyzePropRequest::new("bad-tier", "points", 20.0, season()).with_opponent_tier(9),
            AnalyzePropRequest::new("ok-2", "rebounds", 8.5, vec![7.0, 9.0, 8.0, 10.0, 6.0]),
        ];

        let results = engine.analyze_props_batch(&requests);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().subject_id, "ok-1");
        assert!(matches!(results[1], Err(PropsightError::InsufficientData(_))));
        assert!(matches!(results[2], Err(PropsightError::Validation(_))));
        assert_eq!(results[3].as_ref().unwrap().metric_type, "rebounds");
    }
}
