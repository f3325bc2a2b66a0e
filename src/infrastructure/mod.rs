//! # Infrastructure Layer
//!
//! PostgreSQL storage, Kafka messaging, metrics, and background workers.

pub mod database;
pub mod messaging;
pub mod metrics;
pub mod repositories;
pub mod workers;
