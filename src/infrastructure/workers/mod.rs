//! Background Workers
//!
//! Long-running tasks sharing the process cancellation scope: the outbox
//! dispatcher and the scheduler-event consumer.

pub mod outbox_dispatcher;
pub mod scheduler_consumer;

pub use outbox_dispatcher::OutboxDispatcher;
pub use scheduler_consumer::{BookingCompleter, SchedulerConsumer};
