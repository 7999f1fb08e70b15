//! Postgres outbox repository
//!
//! Enqueueing runs on the caller's `sqlx::Transaction`, so the outbox row
//! commits or rolls back together with the domain change that raised it.
//! The drain side uses its own connections from the pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::{BatchChanges, OutboxStore, OutboxWriter, RecordChange};
use crate::error::OutboxError;
use crate::record::{NewOutboxRecord, OutboxRecord};

/// Migrations creating the `events_outbox` table
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./db/migrations");

#[async_trait]
impl<'c> OutboxWriter for Transaction<'c, Postgres> {
    async fn enqueue(&mut self, record: NewOutboxRecord) -> Result<i64, OutboxError> {
        let record_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO events_outbox
                (event_id, event_type, schema_version, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING record_id
            "#,
        )
        .bind(record.event_id)
        .bind(&record.event_type)
        .bind(record.schema_version)
        .bind(&record.payload)
        .bind(record.created_at)
        .fetch_one(&mut **self)
        .await?;

        Ok(record_id)
    }
}

/// Drain-side access to the `events_outbox` table
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a single record (operator tooling and tests)
    pub async fn get(&self, record_id: i64) -> Result<Option<OutboxRecord>, OutboxError> {
        let record = sqlx::query_as::<_, OutboxRecord>(
            r#"
            SELECT record_id, event_id, event_type, schema_version, payload,
                   created_at, processed_at, error, attempts, next_attempt_at
            FROM events_outbox
            WHERE record_id = $1
            "#,
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_batch(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let records = sqlx::query_as::<_, OutboxRecord>(
            r#"
            SELECT record_id, event_id, event_type, schema_version, payload,
                   created_at, processed_at, error, attempts, next_attempt_at
            FROM events_outbox
            WHERE processed_at IS NULL
              AND (error IS NULL OR (next_attempt_at IS NOT NULL AND next_attempt_at <= $2))
            ORDER BY created_at ASC, record_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn save(&self, changes: BatchChanges) -> Result<(), OutboxError> {
        if changes.is_empty() {
            return Ok(());
        }

        let count = changes.len();
        let mut tx = self.pool.begin().await?;

        for change in changes {
            let (record_id, updated) = match change {
                RecordChange::Processed { record_id, at } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE events_outbox
                        SET processed_at = $2, error = NULL, next_attempt_at = NULL
                        WHERE record_id = $1 AND processed_at IS NULL
                        "#,
                    )
                    .bind(record_id)
                    .bind(at)
                    .execute(&mut *tx)
                    .await?;
                    (record_id, result.rows_affected())
                }
                RecordChange::Failed {
                    record_id,
                    reason,
                    retry_at,
                } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE events_outbox
                        SET error = $2, attempts = attempts + 1, next_attempt_at = $3
                        WHERE record_id = $1 AND processed_at IS NULL
                        "#,
                    )
                    .bind(record_id)
                    .bind(reason)
                    .bind(retry_at)
                    .execute(&mut *tx)
                    .await?;
                    (record_id, result.rows_affected())
                }
            };

            // Zero rows is either already processed (skip) or unknown (reject)
            if updated == 0 {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM events_outbox WHERE record_id = $1)",
                )
                .bind(record_id)
                .fetch_one(&mut *tx)
                .await?;

                if !exists {
                    tracing::warn!(record_id, "Rejecting outbox batch with unknown record");
                    // Dropping the transaction rolls back the earlier updates
                    return Err(OutboxError::UnknownRecord(record_id));
                }
            }
        }

        tx.commit().await?;

        tracing::debug!(changes = count, "Outbox batch flushed");

        Ok(())
    }
}
