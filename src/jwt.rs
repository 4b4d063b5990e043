//! JWT token generation and validation.
//!
//! Access and refresh tokens carry the same payload but are signed with
//! independent secrets and expire independently. Nothing is stored server-side.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::auth::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME};
use crate::db::Role;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived token authorizing regular API calls
    Access,
    /// Long-lived token used only to mint new token pairs
    Refresh,
}

impl TokenKind {
    /// Cookie the token is delivered in and read back from.
    pub fn cookie_name(&self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_COOKIE_NAME,
            TokenKind::Refresh => REFRESH_COOKIE_NAME,
        }
    }
}

/// The subject and active role asserted by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub id: String,
    pub role: Role,
}

impl TokenPayload {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// JWT claims as encoded on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub id: String,
    /// Active role
    pub role: Role,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Freshly signed access and refresh tokens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Secret and lifetime for one token kind.
#[derive(Clone)]
pub struct TokenSettings {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: Duration,
    has_secret: bool,
}

impl TokenSettings {
    pub fn new(secret: &[u8], expires_in: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expires_in,
            has_secret: !secret.is_empty(),
        }
    }

    fn sign(&self, kind: TokenKind, payload: &TokenPayload) -> Result<String, JwtError> {
        if !self.has_secret {
            return Err(JwtError::MissingSecret(kind));
        }

        let now = unix_now()?;
        let claims = Claims {
            id: payload.id.clone(),
            role: payload.role,
            token_type: kind,
            iat: now,
            exp: now + self.expires_in.as_secs(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenPayload, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) {
                    JwtError::Expired
                } else {
                    JwtError::Decoding(e)
                }
            })?;

        if token_data.claims.token_type != kind {
            return Err(JwtError::WrongTokenType);
        }

        Ok(TokenPayload {
            id: token_data.claims.id,
            role: token_data.claims.role,
        })
    }
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    access: TokenSettings,
    refresh: TokenSettings,
}

impl JwtConfig {
    pub fn new(access: TokenSettings, refresh: TokenSettings) -> Self {
        Self { access, refresh }
    }

    pub fn settings(&self, kind: TokenKind) -> &TokenSettings {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Sign a single token of the given kind.
    pub fn sign(&self, kind: TokenKind, payload: &TokenPayload) -> Result<String, JwtError> {
        self.settings(kind).sign(kind, payload)
    }

    /// Sign a fresh access/refresh pair. The two signatures run concurrently.
    pub async fn issue(&self, payload: &TokenPayload) -> Result<TokenPair, JwtError> {
        let (access_token, refresh_token) = futures::future::try_join(
            async { self.sign(TokenKind::Access, payload) },
            async { self.sign(TokenKind::Refresh, payload) },
        )
        .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validate signature, expiry and token type, returning the payload.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenPayload, JwtError> {
        self.settings(kind).verify(kind, token)
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("No signing secret configured for {0:?} tokens")]
    MissingSecret(TokenKind),
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Failed to decode token: {0}")]
    Decoding(jsonwebtoken::errors::Error),
    #[error("Token has expired")]
    Expired,
    #[error("System time error")]
    TimeError,
    #[error("Wrong token type")]
    WrongTokenType,
}
