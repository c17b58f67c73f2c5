use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use propsight::adapters::PostgresStore;
use propsight::config::{AppConfig, LoggingConfig};
use propsight::learning::{ContinuousLearning, LearningStore};

/// Initialize logging with console and optional file output.
///
/// File output is enabled when `PROPSIGHT_LOG_DIR` points at a writable
/// directory; files roll daily.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},propsight=debug,sqlx=warn", config.level))
    });

    let log_dir = std::env::var("PROPSIGHT_LOG_DIR").ok();

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial log file, so preflight writability.
    let file_layer = log_dir.as_deref().and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "Warning: Could not create log directory {} ({}), file logging disabled",
                dir, e
            );
            return None;
        }

        let test_path = std::path::Path::new(dir).join(".propsight_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(dir, "propsight.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    dir, e
                );
                None
            }
        }
    });

    // Console layer, plain or JSON
    let (plain_layer, json_layer) = if config.json {
        (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_target(true)),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
            None,
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/propsight.log", dir);
    }
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Connect to PostgreSQL and bring the schema up to date
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<PostgresStore> {
    let store =
        PostgresStore::new(&config.database.url, config.database.max_connections).await?;
    store.migrate().await?;
    Ok(store)
}

pub fn build_learning(store: Arc<dyn LearningStore>, config: &AppConfig) -> Arc<ContinuousLearning> {
    info!(
        "Learning loop: tolerance {}%, retrain below {}% after {} predictions",
        config.learning.accuracy_tolerance_pct,
        config.learning.accuracy_threshold_pct,
        config.learning.min_predictions
    );
    Arc::new(ContinuousLearning::new(store, &config.learning))
}
