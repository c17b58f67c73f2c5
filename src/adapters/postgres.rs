use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgExecutor, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{
    AccuracyMetric, FeatureImportance, LearningEvent, MetricPeriod, NewRetrainingTrigger,
    PredictionRecord, RetrainingTrigger, Sport, VerificationResult, VerifiedPrediction,
};
use crate::error::{PropsightError, Result};
use crate::learning::aggregator::summarize;
use crate::learning::LearningStore;

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_sport(raw: &str) -> Result<Sport> {
    raw.parse::<Sport>()
        .map_err(|_| PropsightError::Storage(format!("unknown sport '{raw}' in store")))
}

fn parse_period(raw: &str) -> Result<MetricPeriod> {
    raw.parse::<MetricPeriod>()
        .map_err(|_| PropsightError::Storage(format!("unknown period '{raw}' in store")))
}

fn prediction_from_row(row: &PgRow) -> Result<PredictionRecord> {
    let feature_importance = row
        .try_get::<Option<serde_json::Value>, _>("feature_importance")?
        .map(serde_json::from_value::<FeatureImportance>)
        .transpose()?;

    Ok(PredictionRecord {
        id: row.try_get("prediction_id")?,
        sport: parse_sport(row.try_get("sport")?)?,
        subject: row.try_get("subject")?,
        team: row.try_get("team")?,
        opponent: row.try_get("opponent")?,
        scheduled_at: row.try_get("scheduled_at")?,
        metric_type: row.try_get("metric_type")?,
        predicted_value: row.try_get("predicted_value")?,
        confidence_score: row.try_get("confidence_score")?,
        model_version: row.try_get("model_version")?,
        feature_importance,
        created_at: row.try_get("created_at")?,
    })
}

fn verification_from_row(row: &PgRow) -> Result<VerificationResult> {
    Ok(VerificationResult {
        prediction_id: row.try_get("prediction_id")?,
        actual_value: row.try_get("actual_value")?,
        error: row.try_get("prediction_error")?,
        error_percent: row.try_get("error_percentage")?,
        is_accurate: row.try_get("is_accurate")?,
        verified_at: row.try_get("verified_at")?,
        source: row.try_get("data_source")?,
    })
}

fn metric_from_row(row: &PgRow) -> Result<AccuracyMetric> {
    Ok(AccuracyMetric {
        sport: parse_sport(row.try_get("sport")?)?,
        metric_type: row.try_get("metric_type")?,
        period: parse_period(row.try_get("time_period")?)?,
        period_start: row.try_get("period_start")?,
        period_end: row.try_get("period_end")?,
        total_predictions: row.try_get("total_predictions")?,
        correct_predictions: row.try_get("correct_predictions")?,
        accuracy_rate: row.try_get("accuracy_rate")?,
        avg_error: row.try_get("avg_error")?,
        computed_at: row.try_get("computed_at")?,
    })
}

async fn select_verified<'e, E: PgExecutor<'e>>(
    executor: E,
    sport: Sport,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<VerifiedPrediction>> {
    let rows = sqlx::query(
        r#"
        SELECT p.prediction_id, p.sport, p.subject, p.team, p.opponent, p.scheduled_at,
               p.metric_type, p.predicted_value, p.confidence_score, p.model_version,
               p.feature_importance, p.created_at,
               r.actual_value, r.prediction_error, r.error_percentage,
               r.is_accurate, r.data_source, r.verified_at
        FROM prediction_results r
        INNER JOIN predictions p ON p.prediction_id = r.prediction_id
        WHERE p.sport = $1 AND r.verified_at >= $2 AND r.verified_at < $3
        ORDER BY r.verified_at ASC
        "#,
    )
    .bind(sport.as_str())
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(VerifiedPrediction {
                prediction: prediction_from_row(row)?,
                verification: verification_from_row(row)?,
            })
        })
        .collect()
}

/// Insert or update one metric row while its window is open by the
/// database clock. Returns whether a row was written.
async fn write_metric<'e, E: PgExecutor<'e>>(executor: E, metric: &AccuracyMetric) -> Result<bool> {
    let row = sqlx::query(
        r#"
        INSERT INTO model_accuracy_metrics (
            sport, metric_type, time_period, period_start, period_end,
            total_predictions, correct_predictions, accuracy_rate, avg_error, computed_at
        )
        SELECT $1::TEXT, $2::TEXT, $3::TEXT, $4::TIMESTAMPTZ, $5::TIMESTAMPTZ,
               $6::BIGINT, $7::BIGINT, $8::DOUBLE PRECISION, $9::DOUBLE PRECISION,
               $10::TIMESTAMPTZ
        WHERE $5::TIMESTAMPTZ > NOW()
        ON CONFLICT (sport, metric_type, time_period, period_start) DO UPDATE SET
            total_predictions = EXCLUDED.total_predictions,
            correct_predictions = EXCLUDED.correct_predictions,
            accuracy_rate = EXCLUDED.accuracy_rate,
            avg_error = EXCLUDED.avg_error,
            computed_at = EXCLUDED.computed_at
        WHERE model_accuracy_metrics.period_end > NOW()
        RETURNING sport
        "#,
    )
    .bind(metric.sport.as_str())
    .bind(&metric.metric_type)
    .bind(metric.period.as_str())
    .bind(metric.period_start)
    .bind(metric.period_end)
    .bind(metric.total_predictions)
    .bind(metric.correct_predictions)
    .bind(metric.accuracy_rate)
    .bind(metric.avg_error)
    .bind(metric.computed_at)
    .fetch_optional(executor)
    .await?;

    Ok(row.is_some())
}

#[async_trait]
impl LearningStore for PostgresStore {
    // ==================== Predictions ====================

    #[instrument(skip(self, record), fields(prediction_id = %record.id))]
    async fn insert_prediction(&self, record: &PredictionRecord) -> Result<()> {
        let feature_importance = record
            .feature_importance
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO predictions (
                prediction_id, sport, subject, team, opponent, scheduled_at,
                metric_type, predicted_value, confidence_score, model_version,
                feature_importance, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(record.sport.as_str())
        .bind(&record.subject)
        .bind(&record.team)
        .bind(&record.opponent)
        .bind(record.scheduled_at)
        .bind(&record.metric_type)
        .bind(record.predicted_value)
        .bind(record.confidence_score)
        .bind(&record.model_version)
        .bind(feature_importance)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_prediction(&self, prediction_id: Uuid) -> Result<Option<PredictionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT prediction_id, sport, subject, team, opponent, scheduled_at, metric_type,
                   predicted_value, confidence_score, model_version, feature_importance, created_at
            FROM predictions WHERE prediction_id = $1
            "#,
        )
        .bind(prediction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(prediction_from_row).transpose()
    }

    // ==================== Verifications ====================

    #[instrument(skip(self, result), fields(prediction_id = %result.prediction_id))]
    async fn insert_verification(&self, result: &VerificationResult) -> Result<()> {
        let prediction_id = result.prediction_id;
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM predictions WHERE prediction_id = $1")
            .bind(prediction_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Err(PropsightError::PredictionNotFound { prediction_id });
        }

        // UNIQUE (prediction_id) arbitrates concurrent verifications
        let inserted = sqlx::query(
            r#"
            INSERT INTO prediction_results (
                prediction_id, actual_value, prediction_error, error_percentage,
                is_accurate, data_source, verified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (prediction_id) DO NOTHING
            RETURNING result_id
            "#,
        )
        .bind(prediction_id)
        .bind(result.actual_value)
        .bind(result.error)
        .bind(result.error_percent)
        .bind(result.is_accurate)
        .bind(&result.source)
        .bind(result.verified_at)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            return Err(PropsightError::AlreadyVerified { prediction_id });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_verification(&self, prediction_id: Uuid) -> Result<Option<VerificationResult>> {
        let row = sqlx::query(
            r#"
            SELECT prediction_id, actual_value, prediction_error, error_percentage,
                   is_accurate, data_source, verified_at
            FROM prediction_results WHERE prediction_id = $1
            "#,
        )
        .bind(prediction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose()
    }

    async fn verified_between(
        &self,
        sport: Sport,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VerifiedPrediction>> {
        select_verified(&self.pool, sport, start, end).await
    }

    // ==================== Accuracy Metrics ====================

    async fn upsert_metric(&self, metric: &AccuracyMetric) -> Result<bool> {
        write_metric(&self.pool, metric).await
    }

    #[instrument(skip(self))]
    async fn refresh_window(
        &self,
        sport: Sport,
        period: MetricPeriod,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        computed_at: DateTime<Utc>,
    ) -> Result<Vec<AccuracyMetric>> {
        let mut tx = self.pool.begin().await?;

        // Serialize refreshes per sport across processes; the read below
        // starts after the previous holder committed its rows
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("rollup:{}", sport.as_str()))
            .execute(&mut *tx)
            .await?;

        let open: bool = sqlx::query_scalar("SELECT $1::TIMESTAMPTZ > NOW()")
            .bind(end)
            .fetch_one(&mut *tx)
            .await?;
        if !open {
            tx.commit().await?;
            debug!("{} {} window starting {} is closed", sport, period, start);
            return Ok(Vec::new());
        }

        let verified = select_verified(&mut *tx, sport, start, end).await?;
        let mut written = Vec::new();
        for metric in summarize(sport, period, start, end, &verified, computed_at) {
            if write_metric(&mut *tx, &metric).await? {
                written.push(metric);
            }
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn latest_metric(
        &self,
        sport: Sport,
        metric_type: &str,
        period: MetricPeriod,
    ) -> Result<Option<AccuracyMetric>> {
        let row = sqlx::query(
            r#"
            SELECT sport, metric_type, time_period, period_start, period_end,
                   total_predictions, correct_predictions, accuracy_rate, avg_error, computed_at
            FROM model_accuracy_metrics
            WHERE sport = $1 AND metric_type = $2 AND time_period = $3
            ORDER BY period_start DESC
            LIMIT 1
            "#,
        )
        .bind(sport.as_str())
        .bind(metric_type)
        .bind(period.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(metric_from_row).transpose()
    }

    async fn metrics_since(
        &self,
        sport: Sport,
        period: MetricPeriod,
        since: DateTime<Utc>,
    ) -> Result<Vec<AccuracyMetric>> {
        let rows = sqlx::query(
            r#"
            SELECT sport, metric_type, time_period, period_start, period_end,
                   total_predictions, correct_predictions, accuracy_rate, avg_error, computed_at
            FROM model_accuracy_metrics
            WHERE sport = $1 AND time_period = $2 AND period_start >= $3
            ORDER BY period_start DESC, metric_type ASC
            "#,
        )
        .bind(sport.as_str())
        .bind(period.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(metric_from_row).collect()
    }

    // ==================== Retraining Triggers ====================

    #[instrument(skip(self, trigger), fields(sport = %trigger.sport))]
    async fn insert_trigger_if_absent(
        &self,
        trigger: &NewRetrainingTrigger,
    ) -> Result<Option<RetrainingTrigger>> {
        let mut tx = self.pool.begin().await?;

        // Serialize evaluate-and-trigger per sport across processes
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("retrain:{}", trigger.sport.as_str()))
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"
            INSERT INTO model_retraining_triggers (
                sport, reason, accuracy_before_trigger, period_start, triggered_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (sport, period_start) DO NOTHING
            RETURNING trigger_id
            "#,
        )
        .bind(trigger.sport.as_str())
        .bind(&trigger.reason)
        .bind(trigger.accuracy_at_trigger)
        .bind(trigger.period_start)
        .bind(trigger.triggered_at)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        match row {
            Some(row) => {
                let id: i64 = row.try_get("trigger_id")?;
                debug!("Inserted retraining trigger {}", id);
                Ok(Some(RetrainingTrigger::from_new(id, trigger.clone())))
            }
            None => Ok(None),
        }
    }

    // ==================== Learning Log ====================

    async fn append_event(&self, event: &LearningEvent) -> Result<i64> {
        let details = serde_json::to_value(&event.details)?;

        let row = sqlx::query(
            r#"
            INSERT INTO continuous_learning_log (sport, event_type, details, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(event.sport.as_str())
        .bind(event.event_type.as_str())
        .bind(&details)
        .bind(event.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn count_triggers_since(&self, sport: Sport, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*)::BIGINT AS retrains
            FROM model_retraining_triggers
            WHERE sport = $1 AND triggered_at >= $2
            "#,
        )
        .bind(sport.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("retrains")?)
    }

    async fn count_events_since(&self, sport: Sport, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*)::BIGINT AS events
            FROM continuous_learning_log
            WHERE sport = $1 AND created_at >= $2
            "#,
        )
        .bind(sport.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("events")?)
    }
}
