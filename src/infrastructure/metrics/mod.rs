//! Metrics Module
//!
//! Prometheus counters for the background workers and the /metrics endpoint.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

/// Outbox events published to the bus.
pub static OUTBOX_PUBLISHED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "outbox_events_published_total",
        "Outbox events successfully published to the bus"
    )
    .expect("metric registration")
});

/// Outbox events whose publish failed and were marked for requeue.
pub static OUTBOX_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "outbox_events_failed_total",
        "Outbox events whose publish attempt failed"
    )
    .expect("metric registration")
});

/// Outbox events moved from failed back to pending.
pub static OUTBOX_REQUEUED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "outbox_events_requeued_total",
        "Failed outbox events moved back to pending"
    )
    .expect("metric registration")
});

/// Scheduler records consumed, labeled by outcome.
pub static SCHEDULER_RECORDS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "scheduler_records_total",
        "Scheduler events consumed, by outcome",
        &["outcome"]
    )
    .expect("metric registration")
});

/// Render all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buffer) {
        tracing::warn!(error = %err, "failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
