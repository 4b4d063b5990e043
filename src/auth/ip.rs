//! Client IP extraction.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, extract::Request};

/// Key used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client address for rate limiting: first `X-Forwarded-For` entry, then the
/// socket address, else a shared fallback key.
pub fn client_ip<B>(request: &Request<B>) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
