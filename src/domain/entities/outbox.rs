//! Outbox event entity and repository trait.
//!
//! An outbox row is written in the same transaction as the state change it
//! describes; the dispatcher later publishes it to the bus. Status moves
//! `pending → processed`, or `pending → failed → pending → …` under requeue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infrastructure::database::{DbSession, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

impl OutboxStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "processed" => Self::Processed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

/// A queued domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    /// Short suffix ("created", "cancelled", …); the wire event type is
    /// `"{aggregate_type}.{event_type}"`
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// Queue a booking-aggregate event.
    pub fn booking(aggregate_id: Uuid, event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_type: "booking".into(),
            aggregate_id,
            event_type: event_type.into(),
            payload,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Event type as published on the bus.
    pub fn wire_type(&self) -> String {
        format!("{}.{}", self.aggregate_type, self.event_type)
    }
}

/// Repository trait for the outbox table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Insert a pending event (same transaction as the state change).
    async fn append(&self, db: &DbSession, event: &OutboxEvent) -> Result<(), StoreError>;

    /// Claim up to `limit` pending rows, oldest first, with
    /// `FOR UPDATE SKIP LOCKED` so concurrent dispatchers take disjoint
    /// batches.
    async fn fetch_pending(
        &self,
        db: &DbSession,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, StoreError>;

    /// Mark the given rows processed.
    async fn mark_processed(&self, db: &DbSession, ids: &[Uuid]) -> Result<(), StoreError>;

    /// Mark one row failed.
    async fn mark_failed(&self, db: &DbSession, id: Uuid) -> Result<(), StoreError>;

    /// Move up to `limit` failed rows back to pending. Returns how many
    /// were requeued.
    async fn requeue_failed(&self, db: &DbSession, limit: i64) -> Result<u64, StoreError>;
}
