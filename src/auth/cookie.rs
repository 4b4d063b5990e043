//! Token transport: cookie parsing, bearer fallback, and cookie emission.

use axum::http::{HeaderMap, HeaderValue, header};

use crate::jwt::TokenKind;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Lifetime of both token cookies (30 days). Token expiry is enforced by the
/// signature check, not by the browser.
pub const TOKEN_COOKIE_MAX_AGE: u64 = 2_592_000;

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Locate a token of the given kind: the named cookie first, then the bearer header.
pub fn extract_token(headers: &HeaderMap, kind: TokenKind) -> Option<&str> {
    get_cookie(headers, kind.cookie_name())
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
}

/// Build the Set-Cookie value delivering a token.
pub fn token_cookie(kind: TokenKind, token: &str) -> Option<HeaderValue> {
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Strict",
        kind.cookie_name(),
        token,
        TOKEN_COOKIE_MAX_AGE
    );
    HeaderValue::from_str(&cookie).ok()
}
