use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Five-factor weighting surface for the projection synthesis.
///
/// Only `baseline`, `recent_form` and `trend` are computed as separate
/// signals. Whatever weight is left over (historical matchup plus defensive
/// tier in the default set) is applied to the season baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeightingConfig {
    pub baseline: f64,
    pub historical_matchup: f64,
    pub defensive_tier: f64,
    pub recent_form: f64,
    pub trend: f64,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            baseline: 0.55,
            historical_matchup: 0.15,
            defensive_tier: 0.12,
            recent_form: 0.13,
            trend: 0.05,
        }
    }
}

impl WeightingConfig {
    pub fn total(&self) -> f64 {
        self.baseline + self.historical_matchup + self.defensive_tier + self.recent_form + self.trend
    }

    /// Weight not allocated to a separately computed signal.
    /// remainder = 1 - baseline - recent_form - trend
    pub fn remainder(&self) -> f64 {
        1.0 - self.baseline - self.recent_form - self.trend
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Number of most recent values used for recent form
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    /// Number of most recent values used for the trend signal
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// z-score above which recent form is treated as an outlier
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
    /// Edge (percent) required before recommending OVER/UNDER
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f64,
    /// Below this sample size confidence is INSUFFICIENT
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: usize,
    /// Minimum sample size for HIGH confidence
    #[serde(default = "default_high_confidence_sample_size")]
    pub high_confidence_sample_size: usize,
    /// |edge| below this is LOW confidence
    #[serde(default = "default_low_edge_threshold")]
    pub low_edge_threshold: f64,
    /// |edge| above this (with enough samples) is HIGH confidence
    #[serde(default = "default_high_edge_threshold")]
    pub high_edge_threshold: f64,
    #[serde(default)]
    pub weights: WeightingConfig,
}

fn default_recent_window() -> usize {
    5
}

fn default_trend_window() -> usize {
    3
}

fn default_outlier_threshold() -> f64 {
    2.0
}

fn default_edge_threshold() -> f64 {
    5.0
}

fn default_min_sample_size() -> usize {
    5
}

fn default_high_confidence_sample_size() -> usize {
    10
}

fn default_low_edge_threshold() -> f64 {
    3.0
}

fn default_high_edge_threshold() -> f64 {
    8.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            trend_window: default_trend_window(),
            outlier_threshold: default_outlier_threshold(),
            edge_threshold: default_edge_threshold(),
            min_sample_size: default_min_sample_size(),
            high_confidence_sample_size: default_high_confidence_sample_size(),
            low_edge_threshold: default_low_edge_threshold(),
            high_edge_threshold: default_high_edge_threshold(),
            weights: WeightingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LearningConfig {
    /// A verification is accurate when its error percent is at most this
    #[serde(default = "default_accuracy_tolerance")]
    pub accuracy_tolerance_pct: f64,
    /// Verified predictions required before the retraining policy applies
    #[serde(default = "default_min_predictions")]
    pub min_predictions: i64,
    /// Retrain when accuracy falls below this percentage
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold_pct: f64,
    /// Model version stamped on predictions that do not carry one
    #[serde(default = "default_model_version")]
    pub default_model_version: String,
}

fn default_accuracy_tolerance() -> f64 {
    10.0
}

fn default_min_predictions() -> i64 {
    50
}

fn default_accuracy_threshold() -> f64 {
    70.0
}

fn default_model_version() -> String {
    "1.0".to_string()
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            accuracy_tolerance_pct: default_accuracy_tolerance(),
            min_predictions: default_min_predictions(),
            accuracy_threshold_pct: default_accuracy_threshold(),
            default_model_version: default_model_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST facade port (default: 8080)
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.url", "postgres://localhost/propsight")?
            .set_default("database.max_connections", 5)?
            .set_default("api.port", 8080)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PROPSIGHT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PROPSIGHT_DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("PROPSIGHT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config(database_url: &str) -> Self {
        Self {
            engine: EngineConfig::default(),
            learning: LearningConfig::default(),
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: default_max_connections(),
            },
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = self.engine.validate();
        errors.extend(self.learning.validate());

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let w = &self.weights;

        for (name, value) in [
            ("baseline", w.baseline),
            ("historical_matchup", w.historical_matchup),
            ("defensive_tier", w.defensive_tier),
            ("recent_form", w.recent_form),
            ("trend", w.trend),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                errors.push(format!("weights.{name} must be between 0 and 1, got {value}"));
            }
        }

        let total = w.total();
        if (total - 1.0).abs() > 1e-6 {
            errors.push(format!("weights must sum to 1.0, got {total:.6}"));
        }

        if self.recent_window == 0 {
            errors.push("recent_window must be at least 1".to_string());
        }
        if self.trend_window == 0 {
            errors.push("trend_window must be at least 1".to_string());
        }

        for (name, value) in [
            ("outlier_threshold", self.outlier_threshold),
            ("edge_threshold", self.edge_threshold),
            ("low_edge_threshold", self.low_edge_threshold),
            ("high_edge_threshold", self.high_edge_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be a non-negative number, got {value}"));
            }
        }

        if self.low_edge_threshold > self.high_edge_threshold {
            errors.push(format!(
                "low_edge_threshold ({}) must not exceed high_edge_threshold ({})",
                self.low_edge_threshold, self.high_edge_threshold
            ));
        }

        if self.high_confidence_sample_size < self.min_sample_size {
            errors.push(
                "high_confidence_sample_size should not be below min_sample_size".to_string(),
            );
        }

        errors
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.accuracy_tolerance_pct.is_finite() || self.accuracy_tolerance_pct < 0.0 {
            errors.push("accuracy_tolerance_pct must be non-negative".to_string());
        }
        if !(0.0..=100.0).contains(&self.accuracy_threshold_pct) {
            errors.push("accuracy_threshold_pct must be between 0 and 100".to_string());
        }
        if self.min_predictions < 1 {
            errors.push("min_predictions must be at least 1".to_string());
        }
        if self.default_model_version.trim().is_empty() {
            errors.push("default_model_version must not be empty".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = WeightingConfig::default();
        assert!((weights.total() - 1.0).abs() < 1e-9);
        // 1 - 0.55 - 0.13 - 0.05 = 0.27 = matchup + tier
        assert!((weights.remainder() - 0.27).abs() < 1e-9);
        assert!(
            (weights.remainder() - (weights.historical_matchup + weights.defensive_tier)).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default_config("postgres://localhost/propsight");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut config = AppConfig::default_config("postgres://localhost/propsight");
        config.engine.weights.baseline = 0.9;
        config.engine.recent_window = 0;
        config.learning.accuracy_threshold_pct = 120.0;

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("sum to 1.0")));
        assert!(errors.iter().any(|e| e.contains("recent_window")));
        assert!(errors.iter().any(|e| e.contains("accuracy_threshold_pct")));
    }

    #[test]
    fn test_partial_weights_table_keeps_other_defaults() {
        let source = r#"
            recent_window = 7

            [weights]
            baseline = 0.50
            trend = 0.10
        "#;

        let engine: EngineConfig = Config::builder()
            .add_source(File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(engine.recent_window, 7);
        assert_eq!(engine.weights.baseline, 0.50);
        assert_eq!(engine.weights.trend, 0.10);
        assert_eq!(engine.weights.historical_matchup, 0.15);
        assert_eq!(engine.weights.defensive_tier, 0.12);
        assert_eq!(engine.weights.recent_form, 0.13);
        assert!(engine.validate().is_empty());
    }

    #[test]
    fn test_inverted_edge_thresholds_are_rejected() {
        let mut config = AppConfig::default_config("postgres://localhost/propsight");
        config.engine.low_edge_threshold = 9.0;
        config.engine.high_edge_threshold = 4.0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("must not exceed high_edge_threshold"));
    }
}
