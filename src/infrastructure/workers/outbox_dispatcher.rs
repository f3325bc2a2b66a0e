//! Outbox Dispatcher
//!
//! Long-running worker that publishes queued outbox rows to the bus. Two
//! loops run in parallel on the worker's cancellation scope: the main loop
//! claims pending rows, publishes them, and marks them processed or failed;
//! the requeue loop moves failed rows back to pending so delivery is
//! retried indefinitely (at-least-once overall).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::OutboxSettings;
use crate::domain::entities::{OutboxEvent, OutboxRepository};
use crate::infrastructure::database::{DbSession, StoreError, Transactor};
use crate::infrastructure::messaging::{Envelope, EventPublisher};
use crate::infrastructure::metrics;

/// Outbox dispatcher worker.
pub struct OutboxDispatcher<O, P, TM> {
    outbox_repo: Arc<O>,
    publisher: Arc<P>,
    tx: TM,
    topic: String,
    batch_limit: i64,
    requeue_batch_limit: i64,
    interval: Duration,
    requeue_interval: Duration,
}

impl<O, P, TM> OutboxDispatcher<O, P, TM>
where
    O: OutboxRepository,
    P: EventPublisher,
    TM: Transactor,
{
    pub fn new(outbox_repo: Arc<O>, publisher: Arc<P>, tx: TM, settings: &OutboxSettings) -> Self {
        Self {
            outbox_repo,
            publisher,
            tx,
            topic: settings.topic.clone(),
            batch_limit: settings.batch_limit,
            requeue_batch_limit: settings.requeue_batch_limit,
            interval: settings.interval(),
            requeue_interval: settings.requeue_interval(),
        }
    }

    /// Run both loops until cancellation. Each loop finishes its in-flight
    /// sweep before exiting.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            topic = %self.topic,
            interval_ms = self.interval.as_millis() as u64,
            "outbox dispatcher starting"
        );
        tokio::join!(self.main_loop(cancel.clone()), self.requeue_loop(cancel));
        tracing::info!("outbox dispatcher stopped");
    }

    async fn main_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(published) if published > 0 => {
                            tracing::debug!(published, "outbox sweep finished");
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::error!(error = %err, "outbox sweep failed");
                        }
                    }
                }
            }
        }
    }

    async fn requeue_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.requeue_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.requeue_sweep().await {
                        Ok(requeued) if requeued > 0 => {
                            tracing::info!(requeued, "failed outbox events requeued");
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::error!(error = %err, "outbox requeue failed");
                        }
                    }
                }
            }
        }
    }

    /// One main-loop iteration: claim a batch of pending rows, publish each
    /// to the topic keyed by aggregate id, and record the outcome. Claim and
    /// status updates share one transaction so a crashed dispatcher leaves
    /// the rows pending for the next instance.
    pub(crate) async fn sweep(&self) -> Result<usize, StoreError> {
        let db = DbSession::root();
        self.tx
            .in_tx(&db, move |db| async move {
                let events = self.outbox_repo.fetch_pending(&db, self.batch_limit).await?;
                if events.is_empty() {
                    return Ok(0);
                }

                let mut published: Vec<Uuid> = Vec::with_capacity(events.len());
                for event in &events {
                    match self.publish_one(event).await {
                        Ok(()) => published.push(event.id),
                        Err(err) => {
                            tracing::warn!(
                                event_id = %event.id,
                                event_type = %event.wire_type(),
                                error = %err,
                                "publish failed, marking for requeue"
                            );
                            metrics::OUTBOX_FAILED.inc();
                            self.outbox_repo.mark_failed(&db, event.id).await?;
                        }
                    }
                }

                let count = published.len();
                self.outbox_repo.mark_processed(&db, &published).await?;
                metrics::OUTBOX_PUBLISHED.inc_by(count as u64);

                Ok(count)
            })
            .await
    }

    /// One requeue-loop iteration: move a batch of failed rows back to
    /// pending.
    pub(crate) async fn requeue_sweep(&self) -> Result<u64, StoreError> {
        let db = DbSession::root();
        self.tx
            .in_tx(&db, move |db| async move {
                let requeued = self
                    .outbox_repo
                    .requeue_failed(&db, self.requeue_batch_limit)
                    .await?;
                metrics::OUTBOX_REQUEUED.inc_by(requeued);
                Ok(requeued)
            })
            .await
    }

    async fn publish_one(&self, event: &OutboxEvent) -> Result<(), anyhow::Error> {
        let envelope = Envelope::new(event.wire_type(), event.created_at, event.payload.clone());
        let bytes = envelope.to_bytes()?;

        // key by aggregate id for per-aggregate ordering within a partition
        self.publisher
            .publish(&self.topic, &event.aggregate_id.to_string(), &bytes)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::MockOutboxRepository;
    use crate::infrastructure::database::store::PassthroughTransactor;
    use crate::infrastructure::messaging::{MessagingError, MockEventPublisher};
    use serde_json::json;

    fn settings() -> OutboxSettings {
        OutboxSettings {
            topic: "booking-events".into(),
            batch_limit: 100,
            interval_ms: 1_000,
            requeue_batch_limit: 100,
            requeue_interval_ms: 10_000,
        }
    }

    fn pending_event(aggregate_id: Uuid) -> OutboxEvent {
        OutboxEvent::booking(aggregate_id, "created", json!({ "bookingId": aggregate_id }))
    }

    #[tokio::test]
    async fn sweep_publishes_batch_and_marks_processed() {
        let first = pending_event(Uuid::new_v4());
        let second = pending_event(Uuid::new_v4());
        let ids = vec![first.id, second.id];

        let mut outbox_repo = MockOutboxRepository::new();
        let batch = vec![first.clone(), second.clone()];
        outbox_repo
            .expect_fetch_pending()
            .returning(move |_, _| Ok(batch.clone()));
        let expected = ids.clone();
        outbox_repo
            .expect_mark_processed()
            .times(1)
            .withf(move |_, marked| marked == expected.as_slice())
            .returning(|_, _| Ok(()));
        outbox_repo.expect_mark_failed().never();

        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .times(2)
            .withf(|topic, _key, payload| {
                topic == "booking-events"
                    && Envelope::parse(payload)
                        .map(|e| e.event_type == "booking.created")
                        .unwrap_or(false)
            })
            .returning(|_, _, _| Ok(()));

        let dispatcher = OutboxDispatcher::new(
            Arc::new(outbox_repo),
            Arc::new(publisher),
            PassthroughTransactor,
            &settings(),
        );
        assert_eq!(dispatcher.sweep().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn sweep_marks_failed_rows_without_dropping_the_rest() {
        let good = pending_event(Uuid::new_v4());
        let bad = pending_event(Uuid::new_v4());
        let good_id = good.id;
        let bad_id = bad.id;
        let bad_key = bad.aggregate_id.to_string();

        let mut outbox_repo = MockOutboxRepository::new();
        let batch = vec![good.clone(), bad.clone()];
        outbox_repo
            .expect_fetch_pending()
            .returning(move |_, _| Ok(batch.clone()));
        outbox_repo
            .expect_mark_failed()
            .times(1)
            .withf(move |_, id| *id == bad_id)
            .returning(|_, _| Ok(()));
        outbox_repo
            .expect_mark_processed()
            .times(1)
            .withf(move |_, marked| marked == [good_id])
            .returning(|_, _| Ok(()));

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(2).returning(move |_, key, _| {
            if key == bad_key {
                Err(MessagingError::Publish("broker unavailable".into()))
            } else {
                Ok(())
            }
        });

        let dispatcher = OutboxDispatcher::new(
            Arc::new(outbox_repo),
            Arc::new(publisher),
            PassthroughTransactor,
            &settings(),
        );
        assert_eq!(dispatcher.sweep().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_sweep_publishes_nothing() {
        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo
            .expect_fetch_pending()
            .returning(|_, _| Ok(Vec::new()));
        outbox_repo.expect_mark_processed().never();

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();

        let dispatcher = OutboxDispatcher::new(
            Arc::new(outbox_repo),
            Arc::new(publisher),
            PassthroughTransactor,
            &settings(),
        );
        assert_eq!(dispatcher.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn requeue_sweep_reports_moved_rows() {
        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo
            .expect_requeue_failed()
            .withf(|_, limit| *limit == 100)
            .returning(|_, _| Ok(3));

        let dispatcher = OutboxDispatcher::new(
            Arc::new(outbox_repo),
            Arc::new(MockEventPublisher::new()),
            PassthroughTransactor,
            &settings(),
        );
        assert_eq!(dispatcher.requeue_sweep().await.unwrap(), 3);
    }
}
