mod articles;
mod auth;
mod error;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::{GuardChain, RoutePolicy};
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;
use crate::service::AuthService;

pub use error::{ApiError, ResultExt, validate_uuid};

/// Create the API router.
pub fn create_api_router(
    db: Database,
    service: AuthService,
    jwt: Arc<JwtConfig>,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let guards = GuardChain::new(jwt, db.clone(), RoutePolicy::standard());

    let auth_state = auth::AuthState {
        service,
        rate_limit_config,
    };

    let users_state = users::UsersState { db: db.clone() };

    let articles_state = articles::ArticlesState { db };

    Router::new()
        .merge(auth::router(auth_state, &guards))
        .merge(users::router(users_state, &guards))
        .merge(articles::router(articles_state, &guards))
}
