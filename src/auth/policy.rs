//! Per-route role allow-lists.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::errors::{ApiAuthError, AuthErrorKind};
use super::types::AuthenticatedUser;
use crate::db::Role;

const ANY_ROLE: &[Role] = &[Role::Viewer, Role::Editor, Role::Admin];
const WRITERS: &[Role] = &[Role::Editor, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

/// Allow-lists keyed by (method, route pattern). Routes without an entry are
/// open to any authenticated subject.
#[derive(Debug, Default, Clone)]
pub struct RoutePolicy {
    rules: HashMap<(Method, &'static str), &'static [Role]>,
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The application's route table.
    pub fn standard() -> Self {
        Self::new()
            .allow(Method::POST, "/auth/add-role-to-user", ADMIN)
            .allow(Method::GET, "/user", ADMIN)
            .allow(Method::GET, "/user/{id}", ADMIN)
            .allow(Method::PATCH, "/user/{id}", ADMIN)
            .allow(Method::DELETE, "/user/{id}", ANY_ROLE)
            .allow(Method::POST, "/article", WRITERS)
            .allow(Method::GET, "/article", ANY_ROLE)
            .allow(Method::GET, "/article/{id}", ANY_ROLE)
            .allow(Method::GET, "/article/user/{userId}", ANY_ROLE)
            .allow(Method::PATCH, "/article/{id}", WRITERS)
            .allow(Method::DELETE, "/article/{id}", WRITERS)
    }

    pub fn allow(mut self, method: Method, path: &'static str, roles: &'static [Role]) -> Self {
        self.rules.insert((method, path), roles);
        self
    }

    pub fn allowed(&self, method: &Method, path: &str) -> Option<&'static [Role]> {
        self.rules.get(&(method.clone(), path)).copied()
    }

    pub fn permits(&self, method: &Method, path: &str, role: Role) -> bool {
        self.allowed(method, path)
            .is_none_or(|roles| roles.contains(&role))
    }
}

/// Middleware checking the verified role against the matched route's allow-list.
/// Must run after [`super::authenticate`].
pub async fn authorize(
    State(policy): State<Arc<RoutePolicy>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiAuthError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))?;

    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str())
        .unwrap_or_else(|| request.uri().path());

    if !policy.permits(request.method(), path, user.role()) {
        debug!(user_id = %user.id(), role = %user.role(), path, "Role not allowed");
        return Err(ApiAuthError::new(AuthErrorKind::InsufficientRole));
    }

    Ok(next.run(request).await)
}
