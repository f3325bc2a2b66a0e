//! Booking entity, status state machine, and repository trait.
//!
//! Maps to the `bookings` table. Status is monotone: an active booking may
//! become cancelled or completed; both are terminal and rows are never
//! deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infrastructure::database::{DbSession, StoreError};

/// Booking lifecycle status matching the database VARCHAR constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Active,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cancelled" => Self::Cancelled,
            "completed" => Self::Completed,
            _ => Self::Active,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reservation of one place for a `[start_time, end_time)` interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub place_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    /// Free-form reason, present only on cancelled bookings
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set iff status is cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Create a new active booking pending persistence.
    pub fn new(
        user_id: Uuid,
        place_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            place_id,
            start_time,
            end_time,
            status: BookingStatus::Active,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }
}

/// Repository trait for Booking data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert an active booking. The table's exclusion constraint turns a
    /// temporal overlap into `BookingTimeConflict`.
    async fn insert(&self, db: &DbSession, booking: &Booking) -> Result<(), StoreError>;

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// A user's bookings ordered by `start_time DESC`.
    async fn list_by_user(&self, db: &DbSession, user_id: Uuid)
        -> Result<Vec<Booking>, StoreError>;

    /// Transition active → cancelled, guarded by `WHERE status = 'active'`.
    /// Returns whether a row was updated.
    async fn cancel(
        &self,
        db: &DbSession,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<bool, StoreError>;

    /// Transition active → completed, guarded by `WHERE status = 'active'`.
    /// Returns whether a row was updated.
    async fn complete(&self, db: &DbSession, id: Uuid) -> Result<bool, StoreError>;
}
