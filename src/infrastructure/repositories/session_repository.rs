//! Session Repository Implementation
//!
//! PostgreSQL implementation of the SessionRepository trait. The
//! compare-and-set in `revoke_if_active` is what makes refresh tokens
//! single-use under concurrency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Session, SessionRepository};
use crate::infrastructure::database::{DbSession, StoreError};

/// Database row representation matching the sessions table schema.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    user_agent: String,
    ip_address: String,
    device_name: Option<String>,
    expires_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            token_hash: self.token_hash,
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            device_name: self.device_name,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
            revoked: self.revoked,
            created_at: self.created_at,
        }
    }
}

const SESSION_COLUMNS: &str = "id, user_id, token_hash, user_agent, ip_address, device_name, \
                               expires_at, last_used_at, revoked, created_at";

/// PostgreSQL session repository implementation.
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, db: &DbSession, session: &Session) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, user_id, token_hash, user_agent, ip_address, device_name,
                expires_at, last_used_at, revoked, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(&session.device_name)
        .bind(session.expires_at)
        .bind(session.last_used_at)
        .bind(session.revoked)
        .bind(session.created_at)
        .execute(conn.as_exec())
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Session>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn.as_exec())
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn list_by_user(
        &self,
        db: &DbSession,
        user_id: Uuid,
        only_active: bool,
    ) -> Result<Vec<Session>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let rows = if only_active {
            sqlx::query_as::<_, SessionRow>(&format!(
                r#"
                SELECT {SESSION_COLUMNS}
                FROM sessions
                WHERE user_id = $1 AND revoked = FALSE AND expires_at > NOW()
                ORDER BY created_at DESC
                "#
            ))
            .bind(user_id)
            .fetch_all(conn.as_exec())
            .await?
        } else {
            sqlx::query_as::<_, SessionRow>(&format!(
                r#"
                SELECT {SESSION_COLUMNS}
                FROM sessions
                WHERE user_id = $1
                ORDER BY created_at DESC
                "#
            ))
            .bind(user_id)
            .fetch_all(conn.as_exec())
            .await?
        };

        Ok(rows.into_iter().map(SessionRow::into_session).collect())
    }

    async fn touch(&self, db: &DbSession, id: Uuid) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        sqlx::query("UPDATE sessions SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn.as_exec())
            .await?;

        Ok(())
    }

    async fn revoke_if_active(&self, db: &DbSession, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result =
            sqlx::query("UPDATE sessions SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
                .bind(id)
                .execute(conn.as_exec())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke(&self, db: &DbSession, id: Uuid) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        sqlx::query("UPDATE sessions SET revoked = TRUE WHERE id = $1")
            .bind(id)
            .execute(conn.as_exec())
            .await?;

        Ok(())
    }
}
