//! Domain Entities
//!
//! Core business entities and their repository traits.

pub mod booking;
pub mod coworking;
pub mod outbox;
pub mod place;
pub mod session;
pub mod user;

pub use booking::{Booking, BookingRepository, BookingStatus};
pub use coworking::{Coworking, CoworkingLayout, CoworkingRepository, LayoutVersion};
pub use outbox::{OutboxEvent, OutboxRepository, OutboxStatus};
pub use place::{NewPlace, Place, PlaceRepository};
pub use session::{DeviceContext, Session, SessionRepository};
pub use user::{RoleCode, User, UserRepository};

#[cfg(test)]
pub use booking::MockBookingRepository;
#[cfg(test)]
pub use coworking::MockCoworkingRepository;
#[cfg(test)]
pub use outbox::MockOutboxRepository;
#[cfg(test)]
pub use place::MockPlaceRepository;
#[cfg(test)]
pub use session::MockSessionRepository;
#[cfg(test)]
pub use user::MockUserRepository;
