//! Booking Core
//!
//! Validates, creates, cancels, and completes reservations; guards place and
//! coworking activity; manages versioned layouts. Every state change writes
//! its outbox event in the same transaction, and temporal exclusion of
//! active bookings per place is enforced by the store's exclusion
//! constraint.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::entities::{
    Booking, BookingRepository, BookingStatus, Coworking, CoworkingLayout, CoworkingRepository,
    LayoutVersion, NewPlace, OutboxEvent, OutboxRepository, Place, PlaceRepository,
};
use crate::infrastructure::database::{DbSession, StoreError, Transactor};

/// Layout documents must declare this format version.
const LAYOUT_FORMAT_VERSION: u32 = 1;

/// Booking core errors
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking start time is after end time")]
    StartAfterEnd,

    #[error("booking start time equals end time")]
    StartEqualsEnd,

    #[error("booking start time is in the past")]
    StartInPast,

    #[error("booking times must align to whole hours")]
    NotMultipleOfHour,

    #[error("booking duration is less than one hour")]
    DurationLessThanOneHour,

    #[error("booking duration is more than three hours")]
    DurationMoreThanThreeHours,

    #[error("booking not found")]
    BookingNotFound,

    #[error("booking is already cancelled")]
    AlreadyCancelled,

    #[error("booking is already completed")]
    AlreadyCompleted,

    #[error("booking time conflicts with an existing booking")]
    BookingTimeConflict,

    #[error("place not found")]
    PlaceNotFound,

    #[error("place is inactive")]
    PlaceInactive,

    #[error("place has active bookings")]
    PlaceHasActiveBookings,

    #[error("coworking not found")]
    CoworkingNotFound,

    #[error("coworking is inactive")]
    CoworkingInactive,

    #[error("coworking has active bookings")]
    CoworkingHasActiveBookings,

    #[error("layout document is invalid")]
    InvalidLayoutSchema,

    #[error("layout format version is not supported")]
    InvalidLayoutSchemaVersion,

    #[error("cannot create booking")]
    CannotCreateBooking,

    #[error("cannot cancel booking")]
    CannotCancelBooking,

    #[error("cannot complete booking")]
    CannotCompleteBooking,

    #[error("cannot fetch booking")]
    CannotFetchBooking,

    #[error("cannot create coworking")]
    CannotCreateCoworking,

    #[error("cannot update coworking")]
    CannotUpdateCoworking,

    #[error("cannot fetch coworking")]
    CannotFetchCoworking,

    #[error("cannot create place")]
    CannotCreatePlace,

    #[error("cannot update place")]
    CannotUpdatePlace,

    #[error("cannot fetch place")]
    CannotFetchPlace,

    #[error("cannot create layout")]
    CannotCreateLayout,

    #[error("cannot fetch layout")]
    CannotFetchLayout,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Validate a requested interval against the booking rules. The first
/// failing rule wins, and all of this runs before any I/O.
fn validate_interval(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if start > end {
        return Err(BookingError::StartAfterEnd);
    }
    if start == end {
        return Err(BookingError::StartEqualsEnd);
    }
    if start < now {
        return Err(BookingError::StartInPast);
    }
    let on_hour = |t: DateTime<Utc>| t.minute() == 0 && t.second() == 0 && t.nanosecond() == 0;
    if !on_hour(start) || !on_hour(end) {
        return Err(BookingError::NotMultipleOfHour);
    }
    let duration = end - start;
    if duration < chrono::Duration::hours(1) {
        return Err(BookingError::DurationLessThanOneHour);
    }
    if duration > chrono::Duration::hours(3) {
        return Err(BookingError::DurationMoreThanThreeHours);
    }
    Ok(())
}

/// Structural shape of a layout document.
#[derive(Debug, Deserialize)]
struct LayoutDocument {
    format_version: u32,
    places: Vec<LayoutPlace>,
}

#[derive(Debug, Deserialize)]
struct LayoutPlace {
    id: Uuid,
    #[serde(default)]
    #[allow(dead_code)]
    x: Option<f64>,
    #[serde(default)]
    #[allow(dead_code)]
    y: Option<f64>,
}

/// Booking core: reservations, activity gating, layouts.
pub struct BookingService<B, P, C, O, TM> {
    booking_repo: Arc<B>,
    place_repo: Arc<P>,
    coworking_repo: Arc<C>,
    outbox_repo: Arc<O>,
    tx: TM,
}

impl<B, P, C, O, TM> BookingService<B, P, C, O, TM>
where
    B: BookingRepository,
    P: PlaceRepository,
    C: CoworkingRepository,
    O: OutboxRepository,
    TM: Transactor,
{
    pub fn new(
        booking_repo: Arc<B>,
        place_repo: Arc<P>,
        coworking_repo: Arc<C>,
        outbox_repo: Arc<O>,
        tx: TM,
    ) -> Self {
        Self {
            booking_repo,
            place_repo,
            coworking_repo,
            outbox_repo,
            tx,
        }
    }

    /// Create a reservation.
    ///
    /// Validation happens before any I/O; then one transaction loads and
    /// gates the place and its coworking, inserts the active booking (the
    /// exclusion constraint decides temporal conflicts), and queues the
    /// `booking.created` outbox event.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        place_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        validate_interval(start_time, end_time, Utc::now())?;

        tracing::info!(user_id = %user_id, place_id = %place_id, "creating booking");

        let db = DbSession::root();
        let result: Result<Booking, BookingError> = self
            .tx
            .in_tx(&db, move |db| async move {
                let place = self
                    .place_repo
                    .find_by_id(&db, place_id)
                    .await?
                    .ok_or(BookingError::PlaceNotFound)?;
                if !place.is_active {
                    return Err(BookingError::PlaceInactive);
                }

                let coworking = self
                    .coworking_repo
                    .find_by_id(&db, place.coworking_id)
                    .await?
                    .ok_or(BookingError::CoworkingNotFound)?;
                if !coworking.is_active {
                    return Err(BookingError::CoworkingInactive);
                }

                let booking = Booking::new(user_id, place_id, start_time, end_time);
                self.booking_repo
                    .insert(&db, &booking)
                    .await
                    .map_err(|e| match e {
                        StoreError::BookingTimeConflict => BookingError::BookingTimeConflict,
                        StoreError::PlaceNotFound => BookingError::PlaceNotFound,
                        other => BookingError::Storage(other),
                    })?;

                let event = OutboxEvent::booking(
                    booking.id,
                    "created",
                    json!({
                        "bookingId": booking.id,
                        "userId": booking.user_id,
                        "placeId": booking.place_id,
                        "startTime": booking.start_time,
                        "endTime": booking.end_time,
                    }),
                );
                self.outbox_repo.append(&db, &event).await?;

                Ok(booking)
            })
            .await;

        result.map_err(|e| match e {
            BookingError::Storage(err) => {
                tracing::error!(place_id = %place_id, error = %err, "failed to create booking");
                BookingError::CannotCreateBooking
            }
            other => other,
        })
    }

    /// Cancel an active booking, stamping the reason, and queue the
    /// `booking.cancelled` event. Terminal bookings are never touched.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> Result<(), BookingError> {
        tracing::info!(booking_id = %booking_id, "cancelling booking");

        let db = DbSession::root();
        let result: Result<(), BookingError> = self
            .tx
            .in_tx(&db, move |db| async move {
                let booking = self
                    .booking_repo
                    .find_by_id(&db, booking_id)
                    .await?
                    .ok_or(BookingError::BookingNotFound)?;

                match booking.status {
                    BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled),
                    BookingStatus::Completed => return Err(BookingError::AlreadyCompleted),
                    BookingStatus::Active => {}
                }

                let updated = self
                    .booking_repo
                    .cancel(&db, booking_id, reason.clone())
                    .await?;
                if !updated {
                    return Err(BookingError::BookingNotFound);
                }

                let event = OutboxEvent::booking(
                    booking.id,
                    "cancelled",
                    json!({ "bookingId": booking.id, "reason": reason }),
                );
                self.outbox_repo.append(&db, &event).await?;

                Ok(())
            })
            .await;

        result.map_err(|e| match e {
            BookingError::Storage(err) => {
                tracing::error!(booking_id = %booking_id, error = %err, "failed to cancel booking");
                BookingError::CannotCancelBooking
            }
            other => other,
        })
    }

    /// Drive an active booking to completed and queue the
    /// `booking.completed` event. Idempotent for duplicate expiry
    /// deliveries: a terminal booking yields `AlreadyCancelled` /
    /// `AlreadyCompleted` and no second event.
    pub async fn complete_booking(&self, booking_id: Uuid) -> Result<(), BookingError> {
        tracing::info!(booking_id = %booking_id, "completing booking");

        let db = DbSession::root();
        let result: Result<(), BookingError> = self
            .tx
            .in_tx(&db, move |db| async move {
                let booking = self
                    .booking_repo
                    .find_by_id(&db, booking_id)
                    .await?
                    .ok_or(BookingError::BookingNotFound)?;

                match booking.status {
                    BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled),
                    BookingStatus::Completed => return Err(BookingError::AlreadyCompleted),
                    BookingStatus::Active => {}
                }

                let updated = self.booking_repo.complete(&db, booking_id).await?;
                if !updated {
                    return Err(BookingError::BookingNotFound);
                }

                let event = OutboxEvent::booking(
                    booking.id,
                    "completed",
                    json!({ "bookingId": booking.id }),
                );
                self.outbox_repo.append(&db, &event).await?;

                Ok(())
            })
            .await;

        result.map_err(|e| match e {
            BookingError::Storage(err) => {
                tracing::error!(booking_id = %booking_id, error = %err, "failed to complete booking");
                BookingError::CannotCompleteBooking
            }
            other => other,
        })
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let db = DbSession::root();
        self.booking_repo
            .find_by_id(&db, booking_id)
            .await
            .map_err(|e| {
                tracing::error!(booking_id = %booking_id, error = %e, "failed to fetch booking");
                BookingError::CannotFetchBooking
            })?
            .ok_or(BookingError::BookingNotFound)
    }

    pub async fn list_bookings_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        let db = DbSession::root();
        self.booking_repo
            .list_by_user(&db, user_id)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "failed to list bookings");
                BookingError::CannotFetchBooking
            })
    }

    pub async fn create_coworking(
        &self,
        name: String,
        address: String,
    ) -> Result<Coworking, BookingError> {
        let now = Utc::now();
        let coworking = Coworking {
            id: Uuid::new_v4(),
            name,
            address,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let db = DbSession::root();
        self.coworking_repo
            .create(&db, &coworking)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to create coworking");
                BookingError::CannotCreateCoworking
            })?;
        Ok(coworking)
    }

    pub async fn update_coworking(
        &self,
        id: Uuid,
        name: String,
        address: String,
    ) -> Result<(), BookingError> {
        let db = DbSession::root();
        let mut coworking = self
            .coworking_repo
            .find_by_id(&db, id)
            .await?
            .ok_or(BookingError::CoworkingNotFound)?;
        coworking.name = name;
        coworking.address = address;
        coworking.updated_at = Utc::now();

        self.coworking_repo
            .update(&db, &coworking)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => BookingError::CoworkingNotFound,
                other => {
                    tracing::error!(coworking_id = %id, error = %other, "failed to update coworking");
                    BookingError::CannotUpdateCoworking
                }
            })
    }

    pub async fn get_coworking(&self, id: Uuid) -> Result<Coworking, BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .find_by_id(&db, id)
            .await
            .map_err(|e| {
                tracing::error!(coworking_id = %id, error = %e, "failed to fetch coworking");
                BookingError::CannotFetchCoworking
            })?
            .ok_or(BookingError::CoworkingNotFound)
    }

    pub async fn list_coworkings(&self) -> Result<Vec<Coworking>, BookingError> {
        let db = DbSession::root();
        self.coworking_repo.list(&db).await.map_err(|e| {
            tracing::error!(error = %e, "failed to list coworkings");
            BookingError::CannotFetchCoworking
        })
    }

    pub async fn set_coworking_active(&self, id: Uuid) -> Result<(), BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .set_active(&db, id, true)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => BookingError::CoworkingNotFound,
                other => {
                    tracing::error!(coworking_id = %id, error = %other, "failed to activate coworking");
                    BookingError::CannotUpdateCoworking
                }
            })
    }

    /// Deactivate a coworking. Refused while any of its places has an
    /// active booking; the check and the update share one transaction.
    pub async fn set_coworking_inactive(&self, id: Uuid) -> Result<(), BookingError> {
        let db = DbSession::root();
        let result: Result<(), BookingError> = self
            .tx
            .in_tx(&db, move |db| async move {
                if self.coworking_repo.has_active_bookings(&db, id).await? {
                    return Err(BookingError::CoworkingHasActiveBookings);
                }
                self.coworking_repo
                    .set_active(&db, id, false)
                    .await
                    .map_err(|e| match e {
                        StoreError::NotFound => BookingError::CoworkingNotFound,
                        other => BookingError::Storage(other),
                    })
            })
            .await;

        result.map_err(|e| match e {
            BookingError::Storage(err) => {
                tracing::error!(coworking_id = %id, error = %err, "failed to deactivate coworking");
                BookingError::CannotUpdateCoworking
            }
            other => other,
        })
    }

    pub async fn create_places(
        &self,
        coworking_id: Uuid,
        places: Vec<NewPlace>,
    ) -> Result<(), BookingError> {
        if places.is_empty() {
            return Ok(());
        }

        let db = DbSession::root();
        self.coworking_repo
            .find_by_id(&db, coworking_id)
            .await?
            .ok_or(BookingError::CoworkingNotFound)?;

        self.place_repo
            .create_batch(&db, coworking_id, &places)
            .await
            .map_err(|e| {
                tracing::error!(coworking_id = %coworking_id, error = %e, "failed to create places");
                BookingError::CannotCreatePlace
            })
    }

    pub async fn get_places_by_coworking(
        &self,
        coworking_id: Uuid,
    ) -> Result<Vec<Place>, BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .find_by_id(&db, coworking_id)
            .await?
            .ok_or(BookingError::CoworkingNotFound)?;

        self.place_repo
            .list_by_coworking(&db, coworking_id)
            .await
            .map_err(|e| {
                tracing::error!(coworking_id = %coworking_id, error = %e, "failed to list places");
                BookingError::CannotFetchPlace
            })
    }

    /// Active places of the coworking free over the whole `[start, end)`
    /// interval.
    pub async fn get_available_places_by_coworking(
        &self,
        coworking_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Place>, BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .find_by_id(&db, coworking_id)
            .await?
            .ok_or(BookingError::CoworkingNotFound)?;

        self.place_repo
            .list_available_by_coworking(&db, coworking_id, start, end)
            .await
            .map_err(|e| {
                tracing::error!(coworking_id = %coworking_id, error = %e, "failed to list available places");
                BookingError::CannotFetchPlace
            })
    }

    /// Flip a place's activity. Deactivation is refused while the place has
    /// an active booking; the check and the update share one transaction.
    pub async fn set_place_active(&self, place_id: Uuid, active: bool) -> Result<(), BookingError> {
        let db = DbSession::root();
        let result: Result<(), BookingError> = self
            .tx
            .in_tx(&db, move |db| async move {
                if !active && self.place_repo.has_active_bookings(&db, place_id).await? {
                    return Err(BookingError::PlaceHasActiveBookings);
                }
                self.place_repo
                    .set_active(&db, place_id, active)
                    .await
                    .map_err(|e| match e {
                        StoreError::NotFound => BookingError::PlaceNotFound,
                        other => BookingError::Storage(other),
                    })
            })
            .await;

        result.map_err(|e| match e {
            BookingError::Storage(err) => {
                tracing::error!(place_id = %place_id, error = %err, "failed to update place");
                BookingError::CannotUpdatePlace
            }
            other => other,
        })
    }

    /// Append a new layout version after structural validation: supported
    /// format version, and the document's place set must equal the
    /// coworking's current place set exactly.
    pub async fn create_layout_version(
        &self,
        coworking_id: Uuid,
        layout: serde_json::Value,
    ) -> Result<i32, BookingError> {
        let document: LayoutDocument =
            serde_json::from_value(layout.clone()).map_err(|_| BookingError::InvalidLayoutSchema)?;
        if document.format_version != LAYOUT_FORMAT_VERSION {
            return Err(BookingError::InvalidLayoutSchemaVersion);
        }

        let db = DbSession::root();
        let result: Result<i32, BookingError> = self
            .tx
            .in_tx(&db, move |db| {
                async move {
                    self.coworking_repo
                        .find_by_id(&db, coworking_id)
                        .await?
                        .ok_or(BookingError::CoworkingNotFound)?;

                    let places = self.place_repo.list_by_coworking(&db, coworking_id).await?;
                    let mut missing: std::collections::HashSet<Uuid> =
                        places.iter().map(|p| p.id).collect();

                    let mut seen = std::collections::HashSet::new();
                    for place in &document.places {
                        if !missing.remove(&place.id) {
                            // unknown id, or a duplicate of one already seen
                            if !seen.contains(&place.id) {
                                tracing::warn!(place_id = %place.id, "layout references unknown place");
                            }
                            return Err(BookingError::InvalidLayoutSchema);
                        }
                        seen.insert(place.id);
                    }
                    if !missing.is_empty() {
                        tracing::warn!(count = missing.len(), "layout is missing places");
                        return Err(BookingError::InvalidLayoutSchema);
                    }

                    Ok(self
                        .coworking_repo
                        .create_layout_version(&db, coworking_id, &layout)
                        .await?)
                }
            })
            .await;

        result.map_err(|e| match e {
            BookingError::Storage(err) => {
                tracing::error!(coworking_id = %coworking_id, error = %err, "failed to create layout");
                BookingError::CannotCreateLayout
            }
            other => other,
        })
    }

    pub async fn get_latest_layout(
        &self,
        coworking_id: Uuid,
    ) -> Result<CoworkingLayout, BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .latest_layout(&db, coworking_id)
            .await
            .map_err(|e| {
                tracing::error!(coworking_id = %coworking_id, error = %e, "failed to fetch layout");
                BookingError::CannotFetchLayout
            })?
            .ok_or(BookingError::CoworkingNotFound)
    }

    pub async fn get_layout_by_version(
        &self,
        coworking_id: Uuid,
        version: i32,
    ) -> Result<CoworkingLayout, BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .layout_by_version(&db, coworking_id, version)
            .await
            .map_err(|e| {
                tracing::error!(coworking_id = %coworking_id, version, error = %e, "failed to fetch layout");
                BookingError::CannotFetchLayout
            })?
            .ok_or(BookingError::CoworkingNotFound)
    }

    pub async fn list_layout_versions(
        &self,
        coworking_id: Uuid,
    ) -> Result<Vec<LayoutVersion>, BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .find_by_id(&db, coworking_id)
            .await?
            .ok_or(BookingError::CoworkingNotFound)?;

        self.coworking_repo
            .list_layout_versions(&db, coworking_id)
            .await
            .map_err(|e| {
                tracing::error!(coworking_id = %coworking_id, error = %e, "failed to list layout versions");
                BookingError::CannotFetchLayout
            })
    }

    /// Delete the newest layout version.
    pub async fn rollback_latest_layout_version(
        &self,
        coworking_id: Uuid,
    ) -> Result<(), BookingError> {
        let db = DbSession::root();
        self.coworking_repo
            .delete_latest_layout_version(&db, coworking_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => BookingError::CoworkingNotFound,
                other => {
                    tracing::error!(coworking_id = %coworking_id, error = %other, "failed to rollback layout");
                    BookingError::CannotUpdateCoworking
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        MockBookingRepository, MockCoworkingRepository, MockOutboxRepository, MockPlaceRepository,
    };
    use crate::infrastructure::database::store::PassthroughTransactor;
    use chrono::TimeZone;
    use test_case::test_case;

    type TestService = BookingService<
        MockBookingRepository,
        MockPlaceRepository,
        MockCoworkingRepository,
        MockOutboxRepository,
        PassthroughTransactor,
    >;

    fn service(
        booking_repo: MockBookingRepository,
        place_repo: MockPlaceRepository,
        coworking_repo: MockCoworkingRepository,
        outbox_repo: MockOutboxRepository,
    ) -> TestService {
        BookingService::new(
            Arc::new(booking_repo),
            Arc::new(place_repo),
            Arc::new(coworking_repo),
            Arc::new(outbox_repo),
            PassthroughTransactor,
        )
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn active_place(coworking_id: Uuid) -> Place {
        let now = Utc::now();
        Place {
            id: Uuid::new_v4(),
            coworking_id,
            label: "A-1".into(),
            place_type: "desk".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_coworking(id: Uuid) -> Coworking {
        let now = Utc::now();
        Coworking {
            id,
            name: "Downtown".into(),
            address: "1 Main St".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_booking(id: Uuid) -> Booking {
        Booking::new(Uuid::new_v4(), Uuid::new_v4(), utc(2030, 1, 1, 10, 0, 0), utc(2030, 1, 1, 11, 0, 0))
            .tap(|b| b.id = id)
    }

    // small helper so fixtures read naturally
    trait Tap: Sized {
        fn tap(self, f: impl FnOnce(&mut Self)) -> Self;
    }
    impl<T> Tap for T {
        fn tap(mut self, f: impl FnOnce(&mut Self)) -> Self {
            f(&mut self);
            self
        }
    }

    #[test_case(utc(2030, 1, 1, 12, 0, 0), utc(2030, 1, 1, 11, 0, 0) => matches Err(BookingError::StartAfterEnd); "start after end")]
    #[test_case(utc(2030, 1, 1, 11, 0, 0), utc(2030, 1, 1, 11, 0, 0) => matches Err(BookingError::StartEqualsEnd); "start equals end")]
    #[test_case(utc(2000, 1, 1, 10, 0, 0), utc(2000, 1, 1, 11, 0, 0) => matches Err(BookingError::StartInPast); "start in past")]
    #[test_case(utc(2030, 1, 1, 10, 30, 0), utc(2030, 1, 1, 11, 30, 0) => matches Err(BookingError::NotMultipleOfHour); "half hour grid")]
    #[test_case(utc(2030, 1, 1, 10, 0, 0), utc(2030, 1, 1, 11, 0, 30) => matches Err(BookingError::NotMultipleOfHour); "second offset")]
    #[test_case(utc(2030, 1, 1, 9, 0, 0), utc(2030, 1, 1, 13, 0, 0) => matches Err(BookingError::DurationMoreThanThreeHours); "four hours")]
    #[test_case(utc(2030, 1, 1, 10, 0, 0), utc(2030, 1, 1, 11, 0, 0) => matches Ok(()); "one hour")]
    #[test_case(utc(2030, 1, 1, 10, 0, 0), utc(2030, 1, 1, 13, 0, 0) => matches Ok(()); "three hours")]
    fn interval_validation(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), BookingError> {
        validate_interval(start, end, Utc::now())
    }

    #[test]
    fn sub_hour_duration_needs_grid_alignment_first() {
        // 10:00 to 10:30 fails on the grid rule, not on duration
        assert!(matches!(
            validate_interval(
                utc(2030, 1, 1, 10, 0, 0),
                utc(2030, 1, 1, 10, 30, 0),
                Utc::now()
            ),
            Err(BookingError::NotMultipleOfHour)
        ));
    }

    #[tokio::test]
    async fn create_booking_rejects_bad_grid_before_io() {
        // no expectations: any repository call would panic the test
        let svc = service(
            MockBookingRepository::new(),
            MockPlaceRepository::new(),
            MockCoworkingRepository::new(),
            MockOutboxRepository::new(),
        );

        let result = svc
            .create_booking(
                Uuid::new_v4(),
                Uuid::new_v4(),
                utc(2030, 1, 1, 10, 30, 0),
                utc(2030, 1, 1, 11, 30, 0),
            )
            .await;
        assert!(matches!(result, Err(BookingError::NotMultipleOfHour)));
    }

    #[tokio::test]
    async fn create_booking_queues_created_event_in_step() {
        let coworking_id = Uuid::new_v4();
        let place = active_place(coworking_id);
        let place_id = place.id;

        let mut place_repo = MockPlaceRepository::new();
        place_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(place.clone())));

        let mut coworking_repo = MockCoworkingRepository::new();
        coworking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(active_coworking(coworking_id))));

        let mut booking_repo = MockBookingRepository::new();
        booking_repo.expect_insert().times(1).returning(|_, _| Ok(()));

        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo
            .expect_append()
            .times(1)
            .withf(|_, event| {
                event.aggregate_type == "booking"
                    && event.event_type == "created"
                    && event.payload.get("bookingId").is_some()
            })
            .returning(|_, _| Ok(()));

        let svc = service(booking_repo, place_repo, coworking_repo, outbox_repo);
        let booking = svc
            .create_booking(
                Uuid::new_v4(),
                place_id,
                utc(2030, 1, 1, 11, 0, 0),
                utc(2030, 1, 1, 12, 0, 0),
            )
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Active);
    }

    #[tokio::test]
    async fn create_booking_surfaces_time_conflict_without_event() {
        let coworking_id = Uuid::new_v4();
        let place = active_place(coworking_id);
        let place_id = place.id;

        let mut place_repo = MockPlaceRepository::new();
        place_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(place.clone())));

        let mut coworking_repo = MockCoworkingRepository::new();
        coworking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(active_coworking(coworking_id))));

        let mut booking_repo = MockBookingRepository::new();
        booking_repo
            .expect_insert()
            .returning(|_, _| Err(StoreError::BookingTimeConflict));

        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo.expect_append().never();

        let svc = service(booking_repo, place_repo, coworking_repo, outbox_repo);
        let result = svc
            .create_booking(
                Uuid::new_v4(),
                place_id,
                utc(2030, 1, 1, 10, 0, 0),
                utc(2030, 1, 1, 11, 0, 0),
            )
            .await;
        assert!(matches!(result, Err(BookingError::BookingTimeConflict)));
    }

    #[tokio::test]
    async fn create_booking_rejects_inactive_place() {
        let coworking_id = Uuid::new_v4();
        let place = active_place(coworking_id).tap(|p| p.is_active = false);

        let mut place_repo = MockPlaceRepository::new();
        place_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(place.clone())));

        let svc = service(
            MockBookingRepository::new(),
            place_repo,
            MockCoworkingRepository::new(),
            MockOutboxRepository::new(),
        );
        let result = svc
            .create_booking(
                Uuid::new_v4(),
                Uuid::new_v4(),
                utc(2030, 1, 1, 10, 0, 0),
                utc(2030, 1, 1, 11, 0, 0),
            )
            .await;
        assert!(matches!(result, Err(BookingError::PlaceInactive)));
    }

    #[tokio::test]
    async fn cancel_terminal_booking_is_rejected_with_no_event() {
        let booking_id = Uuid::new_v4();
        let cancelled = active_booking(booking_id).tap(|b| b.status = BookingStatus::Cancelled);

        let mut booking_repo = MockBookingRepository::new();
        booking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(cancelled.clone())));
        booking_repo.expect_cancel().never();

        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo.expect_append().never();

        let svc = service(
            booking_repo,
            MockPlaceRepository::new(),
            MockCoworkingRepository::new(),
            outbox_repo,
        );
        assert!(matches!(
            svc.cancel_booking(booking_id, Some("x".into())).await,
            Err(BookingError::AlreadyCancelled)
        ));
    }

    #[tokio::test]
    async fn cancel_active_booking_queues_cancelled_event() {
        let booking_id = Uuid::new_v4();
        let booking = active_booking(booking_id);

        let mut booking_repo = MockBookingRepository::new();
        booking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(booking.clone())));
        booking_repo
            .expect_cancel()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo
            .expect_append()
            .times(1)
            .withf(move |_, event| {
                event.event_type == "cancelled" && event.aggregate_id == booking_id
            })
            .returning(|_, _| Ok(()));

        let svc = service(
            booking_repo,
            MockPlaceRepository::new(),
            MockCoworkingRepository::new(),
            outbox_repo,
        );
        svc.cancel_booking(booking_id, Some("plans changed".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn complete_completed_booking_is_idempotent_noop() {
        let booking_id = Uuid::new_v4();
        let completed = active_booking(booking_id).tap(|b| b.status = BookingStatus::Completed);

        let mut booking_repo = MockBookingRepository::new();
        booking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(completed.clone())));
        booking_repo.expect_complete().never();

        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo.expect_append().never();

        let svc = service(
            booking_repo,
            MockPlaceRepository::new(),
            MockCoworkingRepository::new(),
            outbox_repo,
        );
        assert!(matches!(
            svc.complete_booking(booking_id).await,
            Err(BookingError::AlreadyCompleted)
        ));
    }

    #[tokio::test]
    async fn complete_active_booking_queues_completed_event() {
        let booking_id = Uuid::new_v4();
        let booking = active_booking(booking_id);

        let mut booking_repo = MockBookingRepository::new();
        booking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(booking.clone())));
        booking_repo
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok(true));

        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo
            .expect_append()
            .times(1)
            .withf(move |_, event| {
                event.event_type == "completed" && event.aggregate_id == booking_id
            })
            .returning(|_, _| Ok(()));

        let svc = service(
            booking_repo,
            MockPlaceRepository::new(),
            MockCoworkingRepository::new(),
            outbox_repo,
        );
        svc.complete_booking(booking_id).await.unwrap();
    }

    #[tokio::test]
    async fn place_deactivation_refused_with_active_bookings() {
        let place_id = Uuid::new_v4();

        let mut place_repo = MockPlaceRepository::new();
        place_repo
            .expect_has_active_bookings()
            .returning(|_, _| Ok(true));
        place_repo.expect_set_active().never();

        let svc = service(
            MockBookingRepository::new(),
            place_repo,
            MockCoworkingRepository::new(),
            MockOutboxRepository::new(),
        );
        assert!(matches!(
            svc.set_place_active(place_id, false).await,
            Err(BookingError::PlaceHasActiveBookings)
        ));
    }

    #[tokio::test]
    async fn place_activation_skips_booking_check() {
        let place_id = Uuid::new_v4();

        let mut place_repo = MockPlaceRepository::new();
        place_repo.expect_has_active_bookings().never();
        place_repo
            .expect_set_active()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let svc = service(
            MockBookingRepository::new(),
            place_repo,
            MockCoworkingRepository::new(),
            MockOutboxRepository::new(),
        );
        svc.set_place_active(place_id, true).await.unwrap();
    }

    #[tokio::test]
    async fn coworking_deactivation_refused_with_active_bookings() {
        let coworking_id = Uuid::new_v4();

        let mut coworking_repo = MockCoworkingRepository::new();
        coworking_repo
            .expect_has_active_bookings()
            .returning(|_, _| Ok(true));
        coworking_repo.expect_set_active().never();

        let svc = service(
            MockBookingRepository::new(),
            MockPlaceRepository::new(),
            coworking_repo,
            MockOutboxRepository::new(),
        );
        assert!(matches!(
            svc.set_coworking_inactive(coworking_id).await,
            Err(BookingError::CoworkingHasActiveBookings)
        ));
    }

    #[tokio::test]
    async fn layout_rejects_unsupported_format_version() {
        let svc = service(
            MockBookingRepository::new(),
            MockPlaceRepository::new(),
            MockCoworkingRepository::new(),
            MockOutboxRepository::new(),
        );

        let document = json!({ "format_version": 2, "places": [] });
        assert!(matches!(
            svc.create_layout_version(Uuid::new_v4(), document).await,
            Err(BookingError::InvalidLayoutSchemaVersion)
        ));
    }

    #[tokio::test]
    async fn layout_rejects_unknown_and_missing_places() {
        let coworking_id = Uuid::new_v4();
        let place = active_place(coworking_id);
        let place_id = place.id;

        let mut coworking_repo = MockCoworkingRepository::new();
        coworking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(active_coworking(coworking_id))));
        coworking_repo.expect_create_layout_version().never();

        let mut place_repo = MockPlaceRepository::new();
        place_repo
            .expect_list_by_coworking()
            .returning(move |_, _| Ok(vec![place.clone()]));

        let svc = service(
            MockBookingRepository::new(),
            place_repo,
            coworking_repo,
            MockOutboxRepository::new(),
        );

        // unknown place id
        let unknown = json!({
            "format_version": 1,
            "places": [{ "id": Uuid::new_v4() }]
        });
        assert!(matches!(
            svc.create_layout_version(coworking_id, unknown).await,
            Err(BookingError::InvalidLayoutSchema)
        ));

        // missing the known place
        let empty = json!({ "format_version": 1, "places": [] });
        assert!(matches!(
            svc.create_layout_version(coworking_id, empty).await,
            Err(BookingError::InvalidLayoutSchema)
        ));

        // duplicate of the known place
        let duplicated = json!({
            "format_version": 1,
            "places": [{ "id": place_id }, { "id": place_id }]
        });
        assert!(matches!(
            svc.create_layout_version(coworking_id, duplicated).await,
            Err(BookingError::InvalidLayoutSchema)
        ));
    }

    #[tokio::test]
    async fn layout_with_exact_place_set_is_versioned() {
        let coworking_id = Uuid::new_v4();
        let place = active_place(coworking_id);
        let place_id = place.id;

        let mut coworking_repo = MockCoworkingRepository::new();
        coworking_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(active_coworking(coworking_id))));
        coworking_repo
            .expect_create_layout_version()
            .times(1)
            .returning(|_, _, _| Ok(4));

        let mut place_repo = MockPlaceRepository::new();
        place_repo
            .expect_list_by_coworking()
            .returning(move |_, _| Ok(vec![place.clone()]));

        let svc = service(
            MockBookingRepository::new(),
            place_repo,
            coworking_repo,
            MockOutboxRepository::new(),
        );

        let document = json!({
            "format_version": 1,
            "places": [{ "id": place_id, "x": 1.0, "y": 2.0 }]
        });
        let version = svc
            .create_layout_version(coworking_id, document)
            .await
            .unwrap();
        assert_eq!(version, 4);
    }
}
