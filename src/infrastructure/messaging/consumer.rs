//! Kafka Consumer
//!
//! Subscribing side of the event bus client. Offsets are committed only
//! after the handler succeeds; a failing handler makes the subscriber seek
//! back so the broker redelivers the same record.

use std::future::Future;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::Offset;
use tokio_util::sync::CancellationToken;

use crate::config::KafkaSettings;

use super::MessagingError;

/// How long to pause after a handler failure before the redelivery attempt.
const RETRY_PAUSE: Duration = Duration::from_millis(500);

/// Kafka consumer with consumer-group semantics and manual offset control.
pub struct KafkaSubscriber {
    consumer: StreamConsumer,
}

impl KafkaSubscriber {
    pub fn new(settings: &KafkaSettings, group_id: &str) -> Result<Self, MessagingError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", settings.brokers.join(","))
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set(
                "session.timeout.ms",
                settings.consumer.session_timeout_ms.to_string(),
            )
            .set(
                "heartbeat.interval.ms",
                settings.consumer.heartbeat_interval_ms.to_string(),
            )
            .set(
                "fetch.wait.max.ms",
                settings.consumer.max_wait_ms.to_string(),
            )
            .create()
            .map_err(|e| MessagingError::Configuration(e.to_string()))?;

        Ok(Self { consumer })
    }

    /// Consume `topic` until cancellation, delivering each record to
    /// `handler`. The offset advances only when the handler returns `Ok`;
    /// on `Err` the partition is rewound to the failed record.
    pub async fn run<F, Fut>(
        &self,
        topic: &str,
        cancel: CancellationToken,
        handler: F,
    ) -> Result<(), MessagingError>
    where
        F: Fn(Option<Vec<u8>>, Vec<u8>) -> Fut,
        Fut: Future<Output = Result<(), anyhow::Error>>,
    {
        self.consumer
            .subscribe(&[topic])
            .map_err(|e| MessagingError::Subscribe(e.to_string()))?;

        tracing::info!(topic, "subscribed");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(topic, "consumer shutting down");
                    break;
                }
                received = self.consumer.recv() => {
                    let message = match received {
                        Ok(message) => message,
                        Err(err) => {
                            tracing::warn!(topic, error = %err, "fetch failed");
                            continue;
                        }
                    };

                    let key = message.key().map(|k| k.to_vec());
                    let payload = message.payload().unwrap_or_default().to_vec();

                    match handler(key, payload).await {
                        Ok(()) => {
                            if let Err(err) =
                                self.consumer.commit_message(&message, CommitMode::Async)
                            {
                                tracing::warn!(topic, error = %err, "offset commit failed");
                            }
                        }
                        Err(err) => {
                            tracing::warn!(
                                topic,
                                partition = message.partition(),
                                offset = message.offset(),
                                error = %err,
                                "handler failed, rewinding for redelivery"
                            );
                            if let Err(seek_err) = self.consumer.seek(
                                message.topic(),
                                message.partition(),
                                Offset::Offset(message.offset()),
                                Duration::from_secs(1),
                            ) {
                                tracing::error!(topic, error = %seek_err, "seek failed");
                            }
                            tokio::time::sleep(RETRY_PAUSE).await;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
