//! Token verification strategy and the `Auth` extractor.
//!
//! One verifier serves both token kinds. It differs per kind only in the
//! cookie it reads and the secret it checks against.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use super::cookie::extract_token;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::types::AuthenticatedUser;
use crate::db::Database;
use crate::jwt::{JwtConfig, TokenKind};

#[derive(Clone)]
pub struct TokenVerifier {
    jwt: Arc<JwtConfig>,
    db: Database,
    kind: TokenKind,
}

impl TokenVerifier {
    pub fn new(jwt: Arc<JwtConfig>, db: Database, kind: TokenKind) -> Self {
        Self { jwt, db, kind }
    }

    pub fn access(jwt: Arc<JwtConfig>, db: Database) -> Self {
        Self::new(jwt, db, TokenKind::Access)
    }

    pub fn refresh(jwt: Arc<JwtConfig>, db: Database) -> Self {
        Self::new(jwt, db, TokenKind::Refresh)
    }

    /// Extract, verify and re-confirm the subject of a token.
    pub async fn verify(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, ApiAuthError> {
        let token = extract_token(headers, self.kind)
            .ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))?;

        let payload = self.jwt.verify(self.kind, token).map_err(|e| {
            debug!(kind = ?self.kind, error = %e, "Token rejected");
            ApiAuthError::new(AuthErrorKind::InvalidToken)
        })?;

        let exists = self.db.users().exists(&payload.id).await.map_err(|e| {
            error!("Failed to look up token subject: {}", e);
            ApiAuthError::new(AuthErrorKind::DatabaseError)
        })?;

        if !exists {
            return Err(ApiAuthError::new(AuthErrorKind::UserNotFound));
        }

        Ok(AuthenticatedUser { payload })
    }
}

/// Middleware verifying the request's token and attaching the subject.
pub async fn authenticate(
    State(verifier): State<TokenVerifier>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiAuthError> {
    let user = verifier.verify(request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the subject attached by [`authenticate`].
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))
    }
}
