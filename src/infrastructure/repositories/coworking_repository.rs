//! Coworking Repository Implementation
//!
//! PostgreSQL implementation of the CoworkingRepository trait, including the
//! versioned layout storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Coworking, CoworkingLayout, CoworkingRepository, LayoutVersion};
use crate::infrastructure::database::{DbSession, StoreError};

/// Database row representation matching the coworkings table schema.
#[derive(Debug, sqlx::FromRow)]
struct CoworkingRow {
    id: Uuid,
    name: String,
    address: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CoworkingRow {
    fn into_coworking(self) -> Coworking {
        Coworking {
            id: self.id,
            name: self.name,
            address: self.address,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LayoutRow {
    coworking_id: Uuid,
    version: i32,
    layout: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl LayoutRow {
    fn into_layout(self) -> CoworkingLayout {
        CoworkingLayout {
            coworking_id: self.coworking_id,
            version: self.version,
            layout: self.layout,
            created_at: self.created_at,
        }
    }
}

const COWORKING_COLUMNS: &str = "id, name, address, is_active, created_at, updated_at";

/// PostgreSQL coworking repository implementation.
#[derive(Clone)]
pub struct PgCoworkingRepository {
    pool: PgPool,
}

impl PgCoworkingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoworkingRepository for PgCoworkingRepository {
    async fn create(&self, db: &DbSession, coworking: &Coworking) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        sqlx::query(
            r#"
            INSERT INTO coworkings (id, name, address, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(coworking.id)
        .bind(&coworking.name)
        .bind(&coworking.address)
        .bind(coworking.is_active)
        .bind(coworking.created_at)
        .bind(coworking.updated_at)
        .execute(conn.as_exec())
        .await?;

        Ok(())
    }

    async fn update(&self, db: &DbSession, coworking: &Coworking) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result = sqlx::query(
            r#"
            UPDATE coworkings
            SET name = $2, address = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(coworking.id)
        .bind(&coworking.name)
        .bind(&coworking.address)
        .execute(conn.as_exec())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Coworking>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let row = sqlx::query_as::<_, CoworkingRow>(&format!(
            "SELECT {COWORKING_COLUMNS} FROM coworkings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn.as_exec())
        .await?;

        Ok(row.map(CoworkingRow::into_coworking))
    }

    async fn list(&self, db: &DbSession) -> Result<Vec<Coworking>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let rows = sqlx::query_as::<_, CoworkingRow>(&format!(
            "SELECT {COWORKING_COLUMNS} FROM coworkings ORDER BY name"
        ))
        .fetch_all(conn.as_exec())
        .await?;

        Ok(rows.into_iter().map(CoworkingRow::into_coworking).collect())
    }

    async fn set_active(&self, db: &DbSession, id: Uuid, active: bool) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result =
            sqlx::query("UPDATE coworkings SET is_active = $2, updated_at = NOW() WHERE id = $1")
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
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM bookings b
                JOIN places p ON p.id = b.place_id
                WHERE p.coworking_id = $1 AND b.status = 'active'
            )
            "#,
        )
        .bind(id)
        .fetch_one(conn.as_exec())
        .await?;

        Ok(exists)
    }

    async fn create_layout_version(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        layout: &serde_json::Value,
    ) -> Result<i32, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let version: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO coworking_layouts (coworking_id, version, layout)
            VALUES (
                $1,
                COALESCE(
                    (SELECT MAX(version) FROM coworking_layouts WHERE coworking_id = $1), 0
                ) + 1,
                $2
            )
            RETURNING version
            "#,
        )
        .bind(coworking_id)
        .bind(layout)
        .fetch_one(conn.as_exec())
        .await?;

        Ok(version)
    }

    async fn latest_layout(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<Option<CoworkingLayout>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let row = sqlx::query_as::<_, LayoutRow>(
            r#"
            SELECT coworking_id, version, layout, created_at
            FROM coworking_layouts
            WHERE coworking_id = $1
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(coworking_id)
        .fetch_optional(conn.as_exec())
        .await?;

        Ok(row.map(LayoutRow::into_layout))
    }

    async fn layout_by_version(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        version: i32,
    ) -> Result<Option<CoworkingLayout>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let row = sqlx::query_as::<_, LayoutRow>(
            r#"
            SELECT coworking_id, version, layout, created_at
            FROM coworking_layouts
            WHERE coworking_id = $1 AND version = $2
            "#,
        )
        .bind(coworking_id)
        .bind(version)
        .fetch_optional(conn.as_exec())
        .await?;

        Ok(row.map(LayoutRow::into_layout))
    }

    async fn list_layout_versions(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<Vec<LayoutVersion>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let rows = sqlx::query_as::<_, LayoutVersion>(
            r#"
            SELECT version, created_at
            FROM coworking_layouts
            WHERE coworking_id = $1
            ORDER BY version DESC
            "#,
        )
        .bind(coworking_id)
        .fetch_all(conn.as_exec())
        .await?;

        Ok(rows)
    }

    async fn delete_latest_layout_version(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result = sqlx::query(
            r#"
            DELETE FROM coworking_layouts
            WHERE coworking_id = $1
              AND version = (
                  SELECT MAX(version) FROM coworking_layouts WHERE coworking_id = $1
              )
            "#,
        )
        .bind(coworking_id)
        .execute(conn.as_exec())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
