use clap::Parser;
use propsight::adapters::{InMemoryStore, PostgresStore};
use propsight::cli::{self, output::OutputMode, Cli, Commands};
use propsight::config::AppConfig;
use propsight::domain::AnalyzePropRequest;
use propsight::engine::AntiRecencyEngine;
use propsight::learning::LearningStore;
use std::sync::Arc;
use tracing::{info, warn};

mod main_runtime;

use main_runtime::{build_learning, connect_store, init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mode = OutputMode::from_json_flag(cli.json);

    let config = AppConfig::load_from(&cli.config_dir)?;
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("config: {}", error);
        }
        anyhow::bail!("invalid configuration ({} problems)", errors.len());
    }

    match cli.command {
        Commands::Serve { in_memory, port } => {
            init_logging(&config.logging);
            run_serve(&config, in_memory, port).await?;
        }
        Commands::Migrate => {
            init_logging_simple();
            let store =
                PostgresStore::new(&config.database.url, config.database.max_connections).await?;
            store.migrate().await?;
            println!("Migrations applied");
        }
        Commands::Analyze {
            subject,
            metric,
            line,
            values,
            opponent_tier,
        } => {
            init_logging_simple();
            let engine = AntiRecencyEngine::new(config.engine.clone())?;
            let request =
                AnalyzePropRequest::new(subject, metric, line, values).with_opponent_tier(opponent_tier);
            cli::run_analyze(&engine, request, mode)?;
        }
        Commands::Metrics {
            sport,
            period,
            days_back,
        } => {
            init_logging_simple();
            let store: Arc<dyn LearningStore> = Arc::new(connect_store(&config).await?);
            let learning = build_learning(store, &config);
            cli::show_metrics(&learning, sport, period, days_back, mode).await?;
        }
        Commands::Summary { sport, days_back } => {
            init_logging_simple();
            let store: Arc<dyn LearningStore> = Arc::new(connect_store(&config).await?);
            let learning = build_learning(store, &config);
            cli::show_summary(&learning, sport, days_back, mode).await?;
        }
        Commands::Refresh { sport } => {
            init_logging_simple();
            let store: Arc<dyn LearningStore> = Arc::new(connect_store(&config).await?);
            let learning = build_learning(store, &config);
            cli::run_refresh(&learning, sport, mode).await?;
        }
    }

    Ok(())
}

#[cfg(feature = "api")]
async fn run_serve(config: &AppConfig, in_memory: bool, port: Option<u16>) -> anyhow::Result<()> {
    let engine = Arc::new(AntiRecencyEngine::new(config.engine.clone())?);

    let store: Arc<dyn LearningStore> = if in_memory {
        warn!("Using in-memory store; predictions are lost on exit");
        Arc::new(InMemoryStore::new())
    } else {
        Arc::new(connect_store(config).await?)
    };
    let learning = build_learning(store, config);

    let port = port.unwrap_or(config.api.port);
    info!("Starting propsight on port {}", port);
    propsight::adapters::start_api_server(engine, learning, port).await?;
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn run_serve(_config: &AppConfig, _in_memory: bool, _port: Option<u16>) -> anyhow::Result<()> {
    anyhow::bail!("propsight was built without the `api` feature")
}
