//! Repository Implementations
//!
//! PostgreSQL-backed implementations of the domain repository traits. Every
//! method takes the operation's [`DbSession`](crate::infrastructure::database::DbSession)
//! and executes on its transaction when one is installed.

pub mod booking_repository;
pub mod coworking_repository;
pub mod outbox_repository;
pub mod place_repository;
pub mod session_repository;
pub mod user_repository;

pub use booking_repository::PgBookingRepository;
pub use coworking_repository::PgCoworkingRepository;
pub use outbox_repository::PgOutboxRepository;
pub use place_repository::PgPlaceRepository;
pub use session_repository::PgSessionRepository;
pub use user_repository::PgUserRepository;
