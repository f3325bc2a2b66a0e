//! Kafka Producer
//!
//! Publishing side of the event bus client. Synchronous from the caller's
//! perspective: `publish` resolves after broker acknowledgment, with the
//! acks policy taken from configuration (`all` by default).

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::config::KafkaSettings;

use super::MessagingError;

/// Publishing seam for the outbox dispatcher.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one record and wait for broker acknowledgment.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8])
        -> Result<(), MessagingError>;
}

/// Kafka-backed publisher.
pub struct KafkaPublisher {
    producer: FutureProducer,
    ack_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(settings: &KafkaSettings) -> Result<Self, MessagingError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", settings.brokers.join(","))
            .set("acks", &settings.producer.required_acks)
            .set("batch.size", settings.producer.batch_size.to_string())
            .set("linger.ms", settings.producer.batch_timeout_ms.to_string())
            .set("compression.type", &settings.producer.compression)
            .create()
            .map_err(|e| MessagingError::Configuration(e.to_string()))?;

        Ok(Self {
            producer,
            ack_timeout: Duration::from_secs(10),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(), MessagingError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        self.producer
            .send(record, Timeout::After(self.ack_timeout))
            .await
            .map(|_| ())
            .map_err(|(err, _record)| MessagingError::Publish(err.to_string()))
    }
}
