//! Scheduler Consumer
//!
//! Consumes expiry events from the scheduler topic and drives bookings to
//! completed. Duplicate deliveries are expected (at-least-once bus): a
//! booking that is already terminal counts as handled and the offset
//! advances. Malformed envelopes are logged and skipped; any other failure
//! blocks the offset so the record is redelivered.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::services::booking_service::BookingError;
use crate::infrastructure::messaging::{Envelope, KafkaSubscriber, MessagingError};
use crate::infrastructure::metrics;

/// Expiry event consumed from the scheduler.
const BOOKING_EXPIRE: &str = "booking.expire";

/// The slice of the booking core this consumer drives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingCompleter: Send + Sync {
    async fn complete_booking(&self, booking_id: Uuid) -> Result<(), BookingError>;
}

#[async_trait]
impl<B, P, C, O, TM> BookingCompleter
    for crate::application::services::booking_service::BookingService<B, P, C, O, TM>
where
    B: crate::domain::entities::BookingRepository,
    P: crate::domain::entities::PlaceRepository,
    C: crate::domain::entities::CoworkingRepository,
    O: crate::domain::entities::OutboxRepository,
    TM: crate::infrastructure::database::Transactor,
{
    async fn complete_booking(&self, booking_id: Uuid) -> Result<(), BookingError> {
        Self::complete_booking(self, booking_id).await
    }
}

#[derive(Debug, Deserialize)]
struct ExpirePayload {
    #[serde(rename = "bookingId")]
    booking_id: Uuid,
}

/// Scheduler-topic consumer worker.
pub struct SchedulerConsumer<S> {
    service: Arc<S>,
    subscriber: KafkaSubscriber,
    topic: String,
}

impl<S> SchedulerConsumer<S>
where
    S: BookingCompleter,
{
    pub fn new(service: Arc<S>, subscriber: KafkaSubscriber, topic: String) -> Self {
        Self {
            service,
            subscriber,
            topic,
        }
    }

    /// Consume until cancellation.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MessagingError> {
        tracing::info!(topic = %self.topic, "scheduler consumer starting");

        let service = Arc::clone(&self.service);
        self.subscriber
            .run(&self.topic, cancel, move |_key, payload| {
                let service = Arc::clone(&service);
                async move { process_record(service.as_ref(), &payload).await }
            })
            .await
    }
}

/// Handle one record. `Ok` advances the offset; `Err` blocks it so the
/// broker redelivers.
pub(crate) async fn process_record<S: BookingCompleter>(
    service: &S,
    payload: &[u8],
) -> Result<(), anyhow::Error> {
    let envelope = match Envelope::parse(payload) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "discarding malformed envelope");
            metrics::SCHEDULER_RECORDS.with_label_values(&["malformed"]).inc();
            return Ok(());
        }
    };

    match envelope.event_type.as_str() {
        BOOKING_EXPIRE => {
            let payload: ExpirePayload = match serde_json::from_value(envelope.data) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(error = %err, "discarding expire event with bad payload");
                    metrics::SCHEDULER_RECORDS.with_label_values(&["malformed"]).inc();
                    return Ok(());
                }
            };

            match service.complete_booking(payload.booking_id).await {
                Ok(()) => {
                    metrics::SCHEDULER_RECORDS.with_label_values(&["completed"]).inc();
                    Ok(())
                }
                // duplicate delivery or raced cancellation: already handled
                Err(
                    BookingError::BookingNotFound
                    | BookingError::AlreadyCancelled
                    | BookingError::AlreadyCompleted,
                ) => {
                    metrics::SCHEDULER_RECORDS.with_label_values(&["duplicate"]).inc();
                    Ok(())
                }
                Err(err) => {
                    metrics::SCHEDULER_RECORDS.with_label_values(&["retried"]).inc();
                    Err(err.into())
                }
            }
        }
        other => {
            tracing::warn!(event_type = other, "ignoring unknown event type");
            metrics::SCHEDULER_RECORDS.with_label_values(&["ignored"]).inc();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn expire_envelope(booking_id: Uuid) -> Vec<u8> {
        Envelope::new(
            BOOKING_EXPIRE.into(),
            Utc::now(),
            json!({ "bookingId": booking_id }),
        )
        .to_bytes()
        .unwrap()
    }

    #[tokio::test]
    async fn expire_event_completes_booking_and_advances() {
        let booking_id = Uuid::new_v4();

        let mut completer = MockBookingCompleter::new();
        completer
            .expect_complete_booking()
            .times(1)
            .withf(move |id| *id == booking_id)
            .returning(|_| Ok(()));

        assert!(process_record(&completer, &expire_envelope(booking_id))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn duplicate_delivery_advances_without_state_change() {
        let mut completer = MockBookingCompleter::new();
        completer
            .expect_complete_booking()
            .returning(|_| Err(BookingError::AlreadyCompleted));

        assert!(process_record(&completer, &expire_envelope(Uuid::new_v4()))
            .await
            .is_ok());

        let mut completer = MockBookingCompleter::new();
        completer
            .expect_complete_booking()
            .returning(|_| Err(BookingError::AlreadyCancelled));

        assert!(process_record(&completer, &expire_envelope(Uuid::new_v4()))
            .await
            .is_ok());

        let mut completer = MockBookingCompleter::new();
        completer
            .expect_complete_booking()
            .returning(|_| Err(BookingError::BookingNotFound));

        assert!(process_record(&completer, &expire_envelope(Uuid::new_v4()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn transient_failure_blocks_the_offset() {
        let mut completer = MockBookingCompleter::new();
        completer
            .expect_complete_booking()
            .returning(|_| Err(BookingError::CannotCompleteBooking));

        assert!(process_record(&completer, &expire_envelope(Uuid::new_v4()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn malformed_envelope_is_skipped() {
        let mut completer = MockBookingCompleter::new();
        completer.expect_complete_booking().never();

        assert!(process_record(&completer, b"not json").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_event_type_is_skipped() {
        let mut completer = MockBookingCompleter::new();
        completer.expect_complete_booking().never();

        let payload = Envelope::new("booking.reminder".into(), Utc::now(), json!({}))
            .to_bytes()
            .unwrap();
        assert!(process_record(&completer, &payload).await.is_ok());
    }
}
