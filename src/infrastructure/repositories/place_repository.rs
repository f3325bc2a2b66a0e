//! Place Repository Implementation
//!
//! PostgreSQL implementation of the PlaceRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::domain::entities::{NewPlace, Place, PlaceRepository};
use crate::infrastructure::database::{DbSession, StoreError};

/// Database row representation matching the places table schema.
#[derive(Debug, sqlx::FromRow)]
struct PlaceRow {
    id: Uuid,
    coworking_id: Uuid,
    label: String,
    place_type: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlaceRow {
    fn into_place(self) -> Place {
        Place {
            id: self.id,
            coworking_id: self.coworking_id,
            label: self.label,
            place_type: self.place_type,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const PLACE_COLUMNS: &str =
    "id, coworking_id, label, place_type, is_active, created_at, updated_at";

/// PostgreSQL place repository implementation.
#[derive(Clone)]
pub struct PgPlaceRepository {
    pool: PgPool,
}

impl PgPlaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaceRepository for PgPlaceRepository {
    async fn create_batch(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        places: &[NewPlace],
    ) -> Result<(), StoreError> {
        if places.is_empty() {
            return Ok(());
        }

        let mut builder =
            QueryBuilder::new("INSERT INTO places (coworking_id, label, place_type) ");
        builder.push_values(places, |mut row, place| {
            row.push_bind(coworking_id)
                .push_bind(&place.label)
                .push_bind(&place.place_type);
        });

        let mut conn = db.conn(&self.pool).await?;
        builder.build().execute(conn.as_exec()).await?;

        tracing::debug!(coworking_id = %coworking_id, count = places.len(), "places created");
        Ok(())
    }

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Place>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let row = sqlx::query_as::<_, PlaceRow>(&format!(
            "SELECT {PLACE_COLUMNS} FROM places WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn.as_exec())
        .await?;

        Ok(row.map(PlaceRow::into_place))
    }

    async fn list_by_coworking(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<Vec<Place>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let rows = sqlx::query_as::<_, PlaceRow>(&format!(
            r#"
            SELECT {PLACE_COLUMNS}
            FROM places
            WHERE coworking_id = $1
            ORDER BY label
            "#
        ))
        .bind(coworking_id)
        .fetch_all(conn.as_exec())
        .await?;

        Ok(rows.into_iter().map(PlaceRow::into_place).collect())
    }

    async fn list_available_by_coworking(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Place>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let rows = sqlx::query_as::<_, PlaceRow>(&format!(
            r#"
            SELECT {PLACE_COLUMNS}
            FROM places p
            WHERE p.coworking_id = $1
              AND p.is_active = TRUE
              AND NOT EXISTS (
                  SELECT 1 FROM bookings b
                  WHERE b.place_id = p.id
                    AND b.status = 'active'
                    AND b.start_time < $3
                    AND b.end_time > $2
              )
            ORDER BY p.label
            "#
        ))
        .bind(coworking_id)
        .bind(start)
        .bind(end)
        .fetch_all(conn.as_exec())
        .await?;

        Ok(rows.into_iter().map(PlaceRow::into_place).collect())
    }

    async fn set_active(&self, db: &DbSession, id: Uuid, active: bool) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result =
            sqlx::query("UPDATE places SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(conn.as_exec())
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn has_active_bookings(&self, db: &DbSession, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE place_id = $1 AND status = 'active')",
        )
        .bind(id)
        .fetch_one(conn.as_exec())
        .await?;

        Ok(exists)
    }
}
