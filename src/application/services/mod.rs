//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **TokenAuthority**: JWT minting and verification, refresh-token digests
//! - **SessionService**: Registration, login, rotation, revocation
//! - **BookingService**: Reservations, activity gating, layouts

pub mod booking_service;
pub mod session_service;
pub mod token_authority;

pub use booking_service::{BookingError, BookingService};
pub use session_service::{SessionError, SessionService};
pub use token_authority::{AccessClaims, RefreshClaims, TokenAuthority, TokenError, Tokens};
