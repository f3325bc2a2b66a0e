//! Role Authorization
//!
//! The seam between the HTTP edge and role checks, so tests can substitute
//! the policy.

use crate::domain::entities::RoleCode;

/// Decides whether a set of granted roles satisfies a route's requirement.
pub trait Authorizer: Send + Sync {
    /// `true` when the claims carry at least one of the required roles. An
    /// empty requirement means the route only needs authentication.
    fn check(&self, granted: &[RoleCode], required: &[RoleCode]) -> bool;
}

/// Standard policy: any intersection between granted and required roles.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn check(&self, granted: &[RoleCode], required: &[RoleCode]) -> bool {
        required.is_empty() || granted.iter().any(|role| required.contains(role))
    }
}
