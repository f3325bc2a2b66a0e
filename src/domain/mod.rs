//! # Domain Layer
//!
//! Core business entities and rules of the reservation platform.
//!
//! ## Structure
//!
//! - **entities**: Users, sessions, coworkings, places, bookings, outbox
//!   events, plus their repository traits
//! - **services**: Domain policies (role authorization)
//!
//! Repository traits are defined here so the application layer depends on
//! contracts, not on PostgreSQL.

pub mod entities;
pub mod services;

pub use entities::*;
pub use services::{Authorizer, RoleAuthorizer};
