//! Refresh-token session entity and repository trait.
//!
//! Maps to the `sessions` table. A session row represents one issued
//! refresh token: the row id doubles as the token's `jti` claim, and the
//! stored hash is the SHA-256 of the raw token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infrastructure::database::{DbSession, StoreError};

/// Client context captured when a session is minted.
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    pub user_agent: String,
    pub ip_address: String,
    pub device_name: Option<String>,
}

/// Represents a refresh-token session.
///
/// A refresh token is usable iff `revoked = false`, `expires_at > now`, and
/// its SHA-256 digest matches `token_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// UUID primary key; equals the refresh token's `jti` claim
    pub id: Uuid,

    /// Owner of the session
    pub user_id: Uuid,

    /// SHA-256 hash of the refresh token, lowercase hex (never the raw token)
    #[serde(skip_serializing)]
    pub token_hash: String,

    /// Raw user agent string at session creation
    pub user_agent: String,

    /// Client IP address at session creation
    pub ip_address: String,

    /// Optional human-readable device name
    pub device_name: Option<String>,

    /// When this session expires
    pub expires_at: DateTime<Utc>,

    /// When the refresh token was last exchanged
    pub last_used_at: DateTime<Utc>,

    /// Set on rotation, logout, or administrative revocation
    pub revoked: bool,

    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session pending persistence.
    pub fn new(
        id: Uuid,
        user_id: Uuid,
        token_hash: String,
        device: DeviceContext,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            token_hash,
            user_agent: device.user_agent,
            ip_address: device.ip_address,
            device_name: device.device_name,
            expires_at,
            last_used_at: now,
            revoked: false,
            created_at: now,
        }
    }

    /// Check if the session is currently usable (not expired, not revoked).
    pub fn is_active(&self) -> bool {
        !self.revoked && self.expires_at > Utc::now()
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Repository trait for Session data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session.
    async fn create(&self, db: &DbSession, session: &Session) -> Result<(), StoreError>;

    /// Find a session by its id (the refresh token's `jti`).
    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Session>, StoreError>;

    /// List a user's sessions, newest first. With `only_active`, filters to
    /// unrevoked sessions that have not expired.
    async fn list_by_user(
        &self,
        db: &DbSession,
        user_id: Uuid,
        only_active: bool,
    ) -> Result<Vec<Session>, StoreError>;

    /// Update `last_used_at` to now.
    async fn touch(&self, db: &DbSession, id: Uuid) -> Result<(), StoreError>;

    /// Compare-and-set revocation: flips `revoked` only when it is still
    /// false. Returns whether a row was updated — `false` means another
    /// caller already consumed the session.
    async fn revoke_if_active(&self, db: &DbSession, id: Uuid) -> Result<bool, StoreError>;

    /// Unconditional revocation; revoking an absent or already-revoked
    /// session is a no-op.
    async fn revoke(&self, db: &DbSession, id: Uuid) -> Result<(), StoreError>;
}
