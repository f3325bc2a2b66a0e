//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Application identity (name doubles as the JWT issuer)
    pub app: AppSettings,

    /// HTTP server configuration
    pub http: HttpSettings,

    /// PostgreSQL configuration
    pub postgres: PostgresSettings,

    /// Token authority settings
    pub auth: AuthSettings,

    /// Password hasher settings
    pub hasher: HasherSettings,

    /// Kafka broker, producer, and consumer settings
    pub kafka: KafkaSettings,

    /// Outbox dispatcher settings
    pub outbox: OutboxSettings,

    /// Logger settings
    pub logger: LoggerSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Application identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
}

/// HTTP server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,

    /// Graceful shutdown deadline in seconds
    pub shutdown_timeout: u64,
}

/// PostgreSQL configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSettings {
    /// Database connection URL
    pub url: String,

    /// Connection acquire timeout in seconds
    pub connect_timeout: u64,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,
}

/// Token authority configuration.
///
/// Either `private_key_pem`/`public_key_pem` (RS256) or
/// `access_token_secret`/`refresh_token_secret` (HS256) must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// RSA private key in PEM format (enables RS256 when present)
    #[serde(default)]
    pub private_key_pem: Option<String>,

    /// RSA public key in PEM format (verification side of RS256)
    #[serde(default)]
    pub public_key_pem: Option<String>,

    /// HMAC secret for access tokens (HS256 fallback)
    #[serde(default)]
    pub access_token_secret: Option<String>,

    /// HMAC secret for refresh tokens (HS256 fallback)
    #[serde(default)]
    pub refresh_token_secret: Option<String>,

    /// Access token TTL in seconds
    pub access_token_ttl: u64,

    /// Refresh token TTL in seconds
    pub refresh_token_ttl: u64,
}

/// Password hasher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HasherSettings {
    /// Argon2 iteration count
    pub cost: u32,
}

/// Kafka configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSettings {
    /// Bootstrap broker addresses
    pub brokers: Vec<String>,

    /// Named topics the services use
    pub topics: KafkaTopics,

    pub producer: KafkaProducerSettings,
    pub consumer: KafkaConsumerSettings,
}

/// Topics consumed or produced by the services.
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaTopics {
    /// Topic carrying booking expiry events from the scheduler
    pub scheduler_events: String,
}

/// Producer tuning. These alter throughput, not delivery semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaProducerSettings {
    /// Broker acknowledgment policy ("all" waits for in-sync replicas)
    pub required_acks: String,

    /// Producer batch size in bytes
    pub batch_size: u32,

    /// Time to wait filling a batch, in milliseconds
    pub batch_timeout_ms: u64,

    /// Compression codec (none, gzip, snappy, lz4, zstd)
    pub compression: String,
}

/// Consumer-group tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConsumerSettings {
    pub group_id: String,
    pub max_wait_ms: u64,
    pub session_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub commit_interval_ms: u64,
}

/// Outbox dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxSettings {
    /// Topic outbox events are published to
    pub topic: String,

    /// Rows claimed per main-loop sweep
    pub batch_limit: i64,

    /// Main loop period in milliseconds
    pub interval_ms: u64,

    /// Rows claimed per requeue sweep
    pub requeue_batch_limit: i64,

    /// Requeue loop period in milliseconds
    pub requeue_interval_ms: u64,
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerSettings {
    /// Default tracing level (trace, debug, info, warn, error)
    pub level: String,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("app.name", "coworking-server")?
            .set_default("app.version", env!("CARGO_PKG_VERSION"))?
            .set_default("http.host", "0.0.0.0")?
            .set_default("http.port", 3000)?
            .set_default("http.shutdown_timeout", 10)?
            .set_default("postgres.connect_timeout", 30)?
            .set_default("postgres.max_connections", 10)?
            .set_default("postgres.min_connections", 2)?
            .set_default("auth.access_token_ttl", 900)?
            .set_default("auth.refresh_token_ttl", 604_800)?
            .set_default("hasher.cost", 3)?
            .set_default("kafka.brokers", vec!["localhost:9092"])?
            .set_default("kafka.topics.scheduler_events", "scheduler-events")?
            .set_default("kafka.producer.required_acks", "all")?
            .set_default("kafka.producer.batch_size", 16_384)?
            .set_default("kafka.producer.batch_timeout_ms", 10)?
            .set_default("kafka.producer.compression", "none")?
            .set_default("kafka.consumer.group_id", "booking-service")?
            .set_default("kafka.consumer.max_wait_ms", 500)?
            .set_default("kafka.consumer.session_timeout_ms", 10_000)?
            .set_default("kafka.consumer.heartbeat_interval_ms", 3_000)?
            .set_default("kafka.consumer.commit_interval_ms", 1_000)?
            .set_default("outbox.topic", "booking-events")?
            .set_default("outbox.batch_limit", 100)?
            .set_default("outbox.interval_ms", 1_000)?
            .set_default("outbox.requeue_batch_limit", 100)?
            .set_default("outbox.requeue_interval_ms", 10_000)?
            .set_default("logger.level", "info")?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__HTTP__PORT=3000 -> http.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("http.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("postgres.url", std::env::var("POSTGRES_URL").ok())?
            .set_override_option("logger.level", std::env::var("LOG_LEVEL").ok())?
            .set_override_option(
                "kafka.consumer.group_id",
                std::env::var("KAFKA_CONSUMER_GROUP_ID").ok(),
            )?
            .set_override_option("outbox.topic", std::env::var("OUTBOX_PUB_TOPIC").ok())?
            .build()?
            .try_deserialize()
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

impl OutboxSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn requeue_interval(&self) -> Duration {
        Duration::from_millis(self.requeue_interval_ms)
    }
}
