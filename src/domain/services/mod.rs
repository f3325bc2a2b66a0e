//! Domain Services

pub mod authorizer;

pub use authorizer::{Authorizer, RoleAuthorizer};
