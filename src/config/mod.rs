//! Configuration Management
//!
//! Layered settings loading: defaults, TOML files, environment variables.

mod settings;

pub use settings::{
    AppSettings, AuthSettings, HasherSettings, HttpSettings, KafkaConsumerSettings,
    KafkaProducerSettings, KafkaSettings, KafkaTopics, LoggerSettings, OutboxSettings,
    PostgresSettings, Settings,
};
