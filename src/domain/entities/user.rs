//! User entity and repository trait.
//!
//! Maps to the `users` table (with roles attached through `user_roles`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infrastructure::database::{DbSession, StoreError};

/// Role codes matching the seeded `roles` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleCode {
    Student,
    Teacher,
    Admin,
}

impl RoleCode {
    /// Convert from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a registered account.
///
/// Maps to the `users` table:
/// - id: UUID PRIMARY KEY DEFAULT gen_random_uuid()
/// - email: VARCHAR(255) NOT NULL, unique case-insensitively
/// - password_hash: VARCHAR(255) NOT NULL
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID primary key
    pub id: Uuid,

    /// Email address (unique, case-insensitive)
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Deactivated accounts cannot authenticate or refresh
    pub is_active: bool,

    /// Attached role codes
    pub roles: Vec<RoleCode>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user pending persistence.
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            is_active: true,
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for User data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `UserAlreadyExists` on a duplicate
    /// email.
    async fn create(&self, db: &DbSession, user: &User) -> Result<User, StoreError>;

    /// Find a user (with roles) by id.
    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Find a user (with roles) by email, case-insensitively.
    async fn find_by_email(&self, db: &DbSession, email: &str)
        -> Result<Option<User>, StoreError>;

    /// Attach a role by code. Fails with `NotFound` when the code is not in
    /// the role dictionary.
    async fn attach_role(
        &self,
        db: &DbSession,
        user_id: Uuid,
        role_code: &str,
    ) -> Result<(), StoreError>;
}
