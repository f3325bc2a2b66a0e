//! Coworking entity, versioned layouts, and repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infrastructure::database::{DbSession, StoreError};

/// A coworking space: the container of bookable places.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coworking {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    /// Inactive coworkings reject new bookings on all of their places
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One version of a coworking's floor layout. Versions are append-only and
/// numbered from 1 per coworking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoworkingLayout {
    pub coworking_id: Uuid,
    pub version: i32,
    pub layout: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Version listing entry (layout body omitted).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LayoutVersion {
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Repository trait for Coworking data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoworkingRepository: Send + Sync {
    async fn create(&self, db: &DbSession, coworking: &Coworking) -> Result<(), StoreError>;

    /// Update name and address. `NotFound` when the id does not exist.
    async fn update(&self, db: &DbSession, coworking: &Coworking) -> Result<(), StoreError>;

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Coworking>, StoreError>;

    async fn list(&self, db: &DbSession) -> Result<Vec<Coworking>, StoreError>;

    /// Flip the activity flag. `NotFound` when the id does not exist.
    async fn set_active(&self, db: &DbSession, id: Uuid, active: bool) -> Result<(), StoreError>;

    /// Whether any place of this coworking has an active booking.
    async fn has_active_bookings(&self, db: &DbSession, id: Uuid) -> Result<bool, StoreError>;

    /// Append a new layout version (next version number is allocated here).
    async fn create_layout_version(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        layout: &serde_json::Value,
    ) -> Result<i32, StoreError>;

    async fn latest_layout(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<Option<CoworkingLayout>, StoreError>;

    async fn layout_by_version(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        version: i32,
    ) -> Result<Option<CoworkingLayout>, StoreError>;

    async fn list_layout_versions(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<Vec<LayoutVersion>, StoreError>;

    /// Delete the newest layout version row.
    async fn delete_latest_layout_version(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<(), StoreError>;
}
