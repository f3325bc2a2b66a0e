//! Outbox Repository Implementation
//!
//! PostgreSQL implementation of the OutboxRepository trait. Batch claims use
//! `FOR UPDATE SKIP LOCKED` so concurrent dispatcher instances take disjoint
//! row sets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{OutboxEvent, OutboxRepository, OutboxStatus};
use crate::infrastructure::database::{DbSession, StoreError};

/// Database row representation matching the outbox_events table schema.
#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    aggregate_type: String,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl OutboxRow {
    fn into_event(self) -> OutboxEvent {
        OutboxEvent {
            id: self.id,
            aggregate_type: self.aggregate_type,
            aggregate_id: self.aggregate_id,
            event_type: self.event_type,
            payload: self.payload,
            status: OutboxStatus::from_str(&self.status),
            created_at: self.created_at,
            processed_at: self.processed_at,
        }
    }
}

/// PostgreSQL outbox repository implementation.
#[derive(Clone)]
pub struct PgOutboxRepository {
    pool: PgPool,
}

impl PgOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxRepository for PgOutboxRepository {
    async fn append(&self, db: &DbSession, event: &OutboxEvent) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        sqlx::query(
            r#"
            INSERT INTO outbox_events (
                id, aggregate_type, aggregate_id, event_type, payload, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id)
        .bind(&event.aggregate_type)
        .bind(event.aggregate_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .execute(conn.as_exec())
        .await?;

        tracing::debug!(
            event_id = %event.id,
            aggregate_id = %event.aggregate_id,
            event_type = %event.event_type,
            "outbox event queued"
        );
        Ok(())
    }

    async fn fetch_pending(
        &self,
        db: &DbSession,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, aggregate_type, aggregate_id, event_type, payload, status,
                   created_at, processed_at
            FROM outbox_events
            WHERE status = 'pending'
            ORDER BY created_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(conn.as_exec())
        .await?;

        Ok(rows.into_iter().map(OutboxRow::into_event).collect())
    }

    async fn mark_processed(&self, db: &DbSession, ids: &[Uuid]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut conn = db.conn(&self.pool).await?;
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'processed', processed_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .execute(conn.as_exec())
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, db: &DbSession, id: Uuid) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'failed', processed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(conn.as_exec())
        .await?;

        Ok(())
    }

    async fn requeue_failed(&self, db: &DbSession, limit: i64) -> Result<u64, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result = sqlx::query(
            r#"
            WITH claimed AS (
                SELECT id
                FROM outbox_events
                WHERE status = 'failed'
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE outbox_events o
            SET status = 'pending', processed_at = NULL
            FROM claimed
            WHERE o.id = claimed.id
            "#,
        )
        .bind(limit)
        .execute(conn.as_exec())
        .await?;

        Ok(result.rows_affected())
    }
}
