//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{RoleCode, User, UserRepository};
use crate::infrastructure::database::{DbSession, StoreError};

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, roles: Vec<RoleCode>) -> User {
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            is_active: self.is_active,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roles_of(&self, db: &DbSession, user_id: Uuid) -> Result<Vec<RoleCode>, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let codes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.code
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.code
            "#,
        )
        .bind(user_id)
        .fetch_all(conn.as_exec())
        .await?;

        Ok(codes.iter().filter_map(|c| RoleCode::parse(c)).collect())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, db: &DbSession, user: &User) -> Result<User, StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, password_hash, is_active, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(conn.as_exec())
        .await?;

        Ok(row.into_user(Vec::new()))
    }

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = {
            let mut conn = db.conn(&self.pool).await?;
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT id, email, password_hash, is_active, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(conn.as_exec())
            .await?
        };

        match row {
            Some(row) => {
                let roles = self.roles_of(db, row.id).await?;
                Ok(Some(row.into_user(roles)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_email(
        &self,
        db: &DbSession,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = {
            let mut conn = db.conn(&self.pool).await?;
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT id, email, password_hash, is_active, created_at, updated_at
                FROM users
                WHERE LOWER(email) = LOWER($1)
                "#,
            )
            .bind(email)
            .fetch_optional(conn.as_exec())
            .await?
        };

        match row {
            Some(row) => {
                let roles = self.roles_of(db, row.id).await?;
                Ok(Some(row.into_user(roles)))
            }
            None => Ok(None),
        }
    }

    async fn attach_role(
        &self,
        db: &DbSession,
        user_id: Uuid,
        role_code: &str,
    ) -> Result<(), StoreError> {
        let mut conn = db.conn(&self.pool).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE code = $2
            "#,
        )
        .bind(user_id)
        .bind(role_code)
        .execute(conn.as_exec())
        .await?;

        // zero rows inserted means the role code is not in the dictionary
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
