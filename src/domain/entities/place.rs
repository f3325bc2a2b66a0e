//! Place entity and repository trait.
//!
//! A place is the unit of temporal exclusion: two active bookings on the
//! same place must never overlap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infrastructure::database::{DbSession, StoreError};

/// A bookable unit inside a coworking (desk, meeting room, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    /// Owning coworking (flat foreign key; nesting happens at the API edge)
    pub coworking_id: Uuid,
    pub label: String,
    pub place_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A new place pending batch insertion.
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub label: String,
    pub place_type: String,
}

/// Repository trait for Place data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaceRepository: Send + Sync {
    /// Insert a batch of places for one coworking.
    async fn create_batch(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        places: &[NewPlace],
    ) -> Result<(), StoreError>;

    async fn find_by_id(&self, db: &DbSession, id: Uuid) -> Result<Option<Place>, StoreError>;

    async fn list_by_coworking(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
    ) -> Result<Vec<Place>, StoreError>;

    /// Active places of the coworking with no active booking intersecting
    /// `[start, end)`.
    async fn list_available_by_coworking(
        &self,
        db: &DbSession,
        coworking_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Place>, StoreError>;

    /// Flip the activity flag. `NotFound` when the id does not exist.
    async fn set_active(&self, db: &DbSession, id: Uuid, active: bool) -> Result<(), StoreError>;

    /// Whether this place has an active booking.
    async fn has_active_bookings(&self, db: &DbSession, id: Uuid) -> Result<bool, StoreError>;
}
