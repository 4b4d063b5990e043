//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down credential
//! guessing and registration spam.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Quotas for the limited endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub login_per_second: u32,
    pub register_per_minute: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            login_per_second: 10,
            register_per_minute: 5,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub register: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(Quota::per_second(non_zero(
                settings.login_per_second,
            )))),
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(non_zero(
                settings.register_per_minute,
            )))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(RateLimitSettings::default())
    }
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

fn too_many(message: &'static str) -> Response {
    (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": message }))).into_response()
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Login rate limit exceeded");
            too_many("Too many login attempts. Please wait before trying again.")
        }
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match config.register.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Registration rate limit exceeded");
            too_many("Too many signup attempts. Please wait before trying again.")
        }
    }
}
