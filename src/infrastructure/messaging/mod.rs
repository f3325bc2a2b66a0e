//! Messaging Module
//!
//! Kafka-backed event bus client: envelope format, producer, and consumer.

pub mod consumer;
pub mod envelope;
pub mod producer;

pub use consumer::KafkaSubscriber;
pub use envelope::Envelope;
pub use producer::{EventPublisher, KafkaPublisher};

#[cfg(test)]
pub use producer::MockEventPublisher;

/// Event bus errors
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("bus client configuration invalid: {0}")]
    Configuration(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("envelope serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
