//! Error taxonomy for the authentication service.

use tracing::error;

use crate::db::Role;
use crate::jwt::JwtError;
use crate::password::PasswordError;

/// Message used for both unknown emails and wrong passwords.
pub const INVALID_CREDENTIALS: &str = "Email or password is wrong!";

/// Message accompanying the candidate role list on ambiguous logins.
pub const SELECT_ROLE: &str = "Please, select a role from the list";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A unique field (email) is already taken.
    #[error("{0}")]
    Conflict(String),
    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated, but the role or ownership does not allow this.
    #[error("{0}")]
    Forbidden(String),
    /// A referenced user or role does not exist.
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    /// Login without a role for an account holding zero or several roles.
    #[error("Please, select a role from the list")]
    AmbiguousRole { roles: Vec<Role> },
    /// Storage or signing failure. The message is safe to show to clients.
    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_credentials() -> Self {
        Self::Unauthorized(INVALID_CREDENTIALS.to_string())
    }

    pub fn role_not_held() -> Self {
        Self::Forbidden("This user does not have permission for this role!".to_string())
    }

    pub fn store(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal("Database error".to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        error!(error = %e, "Failed to issue tokens");
        Self::Internal("Failed to issue tokens".to_string())
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        error!(error = %e, "Password hashing failed");
        Self::Internal("Failed to process password".to_string())
    }
}

/// Extension trait for concise store error mapping.
pub trait StoreResultExt<T> {
    fn store_err(self, context: &str) -> Result<T, AuthError>;
}

impl<T> StoreResultExt<T> for Result<T, sqlx::Error> {
    fn store_err(self, context: &str) -> Result<T, AuthError> {
        self.map_err(|e| AuthError::store(context, e))
    }
}
