//! Booking Repository Implementation
//!
//! PostgreSQL implementation of the BookingRepository trait. Inserts rely on
//! the `bookings_no_overlap` exclusion constraint for temporal conflicts,
//! and status transitions are guarded by `WHERE status = 'active'`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Booking, BookingRepository, BookingStatus};
use crate::infrastructure::database::{DbSession, StoreError};

/// Database row representation matching the bookings table schema.
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    place_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl BookingRow {
    fn into_booking(self) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            place_id: self.place_id,
            start_time: self.start_time,
            end_time: self.end_time,
            status: BookingStatus::from_str(&self.status),
            cancel_reason: self.cancel_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
            cancelled_at: self.cancelled_at,
        }
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, place_id, start_time, end_time, status, \
                               cancel_reason, created_at, updated_at, cancelled_at";

/// PostgreSQL booking repository implementation.
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, db: &DbSession, booking: &Booking) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, user_id, place_id, start_time, end_time, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.place_id)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(conn.as_exec())
        .await?;

        tracing::debug!(booking_id = %booking.id, "booking inserted");
        Ok(())
    }

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn.as_exec())
        .await?;

        Ok(row.map(BookingRow::into_booking))
    }

    async fn list_by_user(
        &self,
        db: &DbSession,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE user_id = $1
            ORDER BY start_time DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(conn.as_exec())
        .await?;

        Ok(rows.into_iter().map(BookingRow::into_booking).collect())
    }

    async fn cancel(
        &self,
        db: &DbSession,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<bool, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled',
                cancel_reason = $2,
                cancelled_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(conn.as_exec())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete(&self, db: &DbSession, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'completed',
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .execute(conn.as_exec())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
