//! Propsight CLI
//!
//! Commands:
//! - `propsight serve` - Run the REST facade
//! - `propsight migrate` - Apply database migrations
//! - `propsight analyze` - Project a single prop offline
//! - `propsight metrics` / `propsight summary` - Inspect the feedback loop
//! - `propsight refresh` - Rerun accuracy rollups and the retraining check

pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::domain::{AnalyzePropRequest, LearningSummary, MetricPeriod, Sport, DEFAULT_OPPONENT_TIER};
use crate::engine::AntiRecencyEngine;
use crate::learning::ContinuousLearning;
use output::{print_items, MetricRow, OutputMode, ProjectionRow};

/// Anti-recency prop projections with an accuracy feedback loop
#[derive(Parser, Debug)]
#[command(name = "propsight")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml, <PROPSIGHT_ENV>.toml)
    #[arg(short, long, global = true, default_value = "config")]
    pub config_dir: String,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the REST facade
    Serve {
        /// Keep predictions in process memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
        /// Override api.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply database migrations
    Migrate,

    /// Project a single prop from a value series
    Analyze {
        /// Player or team identifier
        #[arg(long)]
        subject: String,
        /// Stat being projected (points, rebounds, ...)
        #[arg(long)]
        metric: String,
        /// Prop line
        #[arg(long, allow_hyphen_values = true)]
        line: f64,
        /// Historical values, oldest first (comma separated)
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        values: Vec<f64>,
        /// Opponent defensive tier, 1 (best) to 5 (worst)
        #[arg(long, default_value_t = DEFAULT_OPPONENT_TIER)]
        opponent_tier: u8,
    },

    /// Show accuracy metrics for a sport
    Metrics {
        #[arg(value_parser = parse_sport)]
        sport: Sport,
        #[arg(long, default_value = "daily", value_parser = parse_period)]
        period: MetricPeriod,
        #[arg(long, default_value_t = 30)]
        days_back: i64,
    },

    /// Show retraining and learning-event counts for a sport
    Summary {
        #[arg(value_parser = parse_sport)]
        sport: Sport,
        #[arg(long, default_value_t = 30)]
        days_back: i64,
    },

    /// Recompute a sport's open accuracy rollups and re-evaluate retraining
    Refresh {
        #[arg(value_parser = parse_sport)]
        sport: Sport,
    },
}

fn parse_sport(raw: &str) -> std::result::Result<Sport, String> {
    raw.parse().map_err(|e: crate::error::PropsightError| e.to_string())
}

fn parse_period(raw: &str) -> std::result::Result<MetricPeriod, String> {
    raw.parse().map_err(|e: crate::error::PropsightError| e.to_string())
}

pub fn run_analyze(
    engine: &AntiRecencyEngine,
    request: AnalyzePropRequest,
    mode: OutputMode,
) -> Result<()> {
    let projection = engine.analyze(&request)?;
    match mode {
        OutputMode::Table => print_items(&[ProjectionRow::from(&projection)], mode),
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(&projection)?);
            Ok(())
        }
    }
}

pub async fn show_metrics(
    learning: &ContinuousLearning,
    sport: Sport,
    period: MetricPeriod,
    days_back: i64,
    mode: OutputMode,
) -> Result<()> {
    let metrics = learning
        .get_accuracy_metrics(sport, period, days_back)
        .await?;
    match mode {
        OutputMode::Table => {
            let rows: Vec<MetricRow> = metrics.iter().map(MetricRow::from).collect();
            print_items(&rows, mode)
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
            Ok(())
        }
    }
}

pub async fn show_summary(
    learning: &ContinuousLearning,
    sport: Sport,
    days_back: i64,
    mode: OutputMode,
) -> Result<()> {
    let summary: LearningSummary = learning.get_learning_summary(sport, days_back).await?;
    match mode {
        OutputMode::Table => {
            println!("{} over the last {} days", sport, days_back);
            println!("  retraining events: {}", summary.retraining_events);
            println!("  learning events:   {}", summary.learning_events);
        }
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

pub async fn run_refresh(learning: &ContinuousLearning, sport: Sport, mode: OutputMode) -> Result<()> {
    let trigger = learning.refresh_sport(sport).await?;
    match mode {
        OutputMode::Table => match &trigger {
            Some(trigger) => println!(
                "{}: rollups refreshed, retraining triggered ({})",
                sport, trigger.reason
            ),
            None => println!("{}: rollups refreshed", sport),
        },
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&trigger)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_command() {
        let cli = Cli::try_parse_from([
            "propsight",
            "analyze",
            "--subject",
            "Nikola Jokic",
            "--metric",
            "rebounds",
            "--line",
            "11.5",
            "--values",
            "12,14,10,13,11",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                values,
                opponent_tier,
                line,
                ..
            } => {
                assert_eq!(values, vec![12.0, 14.0, 10.0, 13.0, 11.0]);
                assert_eq!(opponent_tier, DEFAULT_OPPONENT_TIER);
                assert_eq!(line, 11.5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_metrics_command() {
        let cli =
            Cli::try_parse_from(["propsight", "metrics", "NBA", "--period", "weekly", "--json"])
                .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Metrics {
                sport,
                period,
                days_back,
            } => {
                assert_eq!(sport, Sport::Nba);
                assert_eq!(period, MetricPeriod::Weekly);
                assert_eq!(days_back, 30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_refresh_command() {
        let cli = Cli::try_parse_from(["propsight", "refresh", "nhl"]).unwrap();
        match cli.command {
            Commands::Refresh { sport } => assert_eq!(sport, Sport::Nhl),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_refresh_counts_committed_verifications() {
        use crate::adapters::InMemoryStore;
        use crate::config::LearningConfig;
        use crate::domain::{NewPrediction, ALL_METRIC_TYPES};
        use crate::learning::LearningStore;
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let learning = ContinuousLearning::new(store.clone(), &LearningConfig::default());
        let id = learning
            .log_prediction(NewPrediction {
                sport: Sport::Nhl,
                subject: "Connor McDavid".into(),
                team: Some("EDM".into()),
                opponent: "CGY".into(),
                scheduled_at: chrono::Utc::now(),
                metric_type: "points".into(),
                predicted_value: 1.5,
                confidence_score: None,
                model_version: None,
                feature_importance: None,
            })
            .await
            .unwrap();
        learning.verify_result(id, 2.0, "box_score").await.unwrap();

        run_refresh(&learning, Sport::Nhl, OutputMode::Json).await.unwrap();

        let all = store
            .latest_metric(Sport::Nhl, ALL_METRIC_TYPES, MetricPeriod::Daily)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(all.total_predictions, 1);
    }

    #[test]
    fn test_unknown_sport_is_rejected() {
        assert!(Cli::try_parse_from(["propsight", "summary", "curling"]).is_err());
    }
}
