//! Guard chain: token extraction and verification, then per-route role checks.
//!
//! Access and refresh tokens are both accepted from a cookie or, when the
//! cookie is absent, from a bearer header. Verification re-confirms that the
//! subject still exists on every request.

mod chain;
mod cookie;
mod errors;
mod ip;
mod policy;
mod types;
mod verifier;

pub use chain::GuardChain;
pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, TOKEN_COOKIE_MAX_AGE, bearer_token, extract_token,
    get_cookie, token_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use ip::{UNKNOWN_CLIENT, client_ip};
pub use policy::{RoutePolicy, authorize};
pub use types::AuthenticatedUser;
pub use verifier::{Auth, TokenVerifier, authenticate};
