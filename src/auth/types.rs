//! Authentication user types.

use crate::db::Role;
use crate::jwt::TokenPayload;

/// Verified subject attached to the request by the guard chain.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub payload: TokenPayload,
}

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.payload.id
    }

    pub fn role(&self) -> Role {
        self.payload.role
    }

    /// Whether the subject may act on a resource owned by `owner_id`, given
    /// which roles are allowed to act on other people's resources.
    pub fn owns_or(&self, owner_id: &str, unrestricted: &[Role]) -> bool {
        unrestricted.contains(&self.payload.role) || self.payload.id == owner_id
    }
}
