//! Assembly of verification and authorization onto routers.

use std::sync::Arc;

use axum::{Router, middleware};

use super::policy::{RoutePolicy, authorize};
use super::verifier::{TokenVerifier, authenticate};
use crate::db::Database;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct GuardChain {
    access: TokenVerifier,
    refresh: TokenVerifier,
    policy: Arc<RoutePolicy>,
}

impl GuardChain {
    pub fn new(jwt: Arc<JwtConfig>, db: Database, policy: RoutePolicy) -> Self {
        Self {
            access: TokenVerifier::access(jwt.clone(), db.clone()),
            refresh: TokenVerifier::refresh(jwt, db),
            policy: Arc::new(policy),
        }
    }

    /// Require a valid access token and a permitted role on every route of `router`.
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Self::layer(router, &self.access, &self.policy)
    }

    /// Same as [`Self::protect`], but verifying refresh tokens.
    pub fn protect_refresh<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Self::layer(router, &self.refresh, &self.policy)
    }

    fn layer<S>(router: Router<S>, verifier: &TokenVerifier, policy: &Arc<RoutePolicy>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // Layers added later run first: verification precedes authorization.
        router
            .route_layer(middleware::from_fn_with_state(policy.clone(), authorize))
            .route_layer(middleware::from_fn_with_state(verifier.clone(), authenticate))
    }
}
