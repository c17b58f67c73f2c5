//! Output formatting for `propsight` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::{AccuracyMetric, WeightedProjection};

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
pub struct ProjectionRow {
    pub subject: String,
    pub metric: String,
    pub line: String,
    pub baseline: String,
    pub projection: String,
    pub edge: String,
    pub confidence: String,
    pub pick: String,
    pub outlier: bool,
}

impl From<&WeightedProjection> for ProjectionRow {
    fn from(p: &WeightedProjection) -> Self {
        Self {
            subject: p.subject_id.clone(),
            metric: p.metric_type.clone(),
            line: format!("{:.1}", p.line),
            baseline: format!("{:.2}", p.season_baseline),
            projection: format!("{:.2}", p.final_projection),
            edge: format!("{:+.1}%", p.edge_percent),
            confidence: p.confidence_level.to_string(),
            pick: p
                .recommendation
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            outlier: p.is_outlier,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct MetricRow {
    pub period_start: String,
    pub metric_type: String,
    pub total: i64,
    pub correct: i64,
    pub accuracy: String,
    pub avg_error: String,
}

impl From<&AccuracyMetric> for MetricRow {
    fn from(m: &AccuracyMetric) -> Self {
        Self {
            period_start: m.period_start.format("%Y-%m-%d").to_string(),
            metric_type: m.metric_type.clone(),
            total: m.total_predictions,
            correct: m.correct_predictions,
            accuracy: format!("{:.1}%", m.accuracy_rate),
            avg_error: format!("{:.2}", m.avg_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AntiRecencyEngine;

    #[test]
    fn test_projection_row_formats_pick() {
        let engine = AntiRecencyEngine::default();
        let projection = engine
            .analyze_prop("Luka Doncic", "points", 20.0, &[30.0, 31.0, 29.0, 32.0, 30.0, 28.0], 3)
            .unwrap();

        let row = ProjectionRow::from(&projection);
        assert_eq!(row.pick, "OVER");
        assert!(row.edge.starts_with('+'));
    }
}
