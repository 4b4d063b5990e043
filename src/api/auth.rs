use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, require_non_empty, validate_email, validate_uuid};
use crate::auth::{Auth, GuardChain, token_cookie};
use crate::db::Role;
use crate::jwt::{TokenKind, TokenPair};
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};
use crate::service::AuthService;

#[derive(Clone)]
pub struct AuthState {
    pub service: AuthService,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: AuthState, guards: &GuardChain) -> Router {
    let register_router = Router::new()
        .route("/auth/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_register,
        ));

    let login_router = Router::new()
        .route("/auth/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    let refresh_router =
        guards.protect_refresh(Router::<AuthState>::new().route("/auth/refresh", get(refresh)));

    let protected_router = guards.protect(
        Router::<AuthState>::new()
            .route("/auth/change-role", post(change_role))
            .route("/auth/add-role-to-user", post(add_role_to_user)),
    );

    Router::new()
        .merge(register_router)
        .merge(login_router)
        .merge(refresh_router.merge(protected_router).with_state(state))
}

/// Parse a role name from a request body field.
pub(super) fn parse_role(name: &str) -> Result<Role, ApiError> {
    name.parse().map_err(|_| {
        ApiError::bad_request("role must be one of the following values: Viewer, Editor, Admin")
    })
}

/// 200 response carrying the pair both as cookies and as a JSON body.
fn token_response(pair: TokenPair) -> Response {
    let cookies = [
        token_cookie(TokenKind::Access, &pair.access_token),
        token_cookie(TokenKind::Refresh, &pair.refresh_token),
    ];

    let mut response = (StatusCode::OK, Json(pair)).into_response();
    for value in cookies.into_iter().flatten() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct RegisterResponse {
    id: String,
}

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    validate_email(email)?;
    require_non_empty(&payload.password, "password")?;

    let id = state.service.register(email, &payload.password).await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = payload.email.trim();
    validate_email(email)?;
    require_non_empty(&payload.password, "password")?;
    let role = payload.role.as_deref().map(parse_role).transpose()?;

    let pair = state.service.login(email, &payload.password, role).await?;

    Ok(token_response(pair))
}

async fn refresh(
    State(state): State<AuthState>,
    Auth(user): Auth,
) -> Result<Response, ApiError> {
    let pair = state.service.refresh(&user.payload).await?;
    Ok(token_response(pair))
}

#[derive(Deserialize)]
struct ChangeRoleRequest {
    role: String,
}

async fn change_role(
    State(state): State<AuthState>,
    Auth(user): Auth,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<Response, ApiError> {
    let role = parse_role(&payload.role)?;
    let pair = state.service.change_role(&user.payload, role).await?;
    Ok(token_response(pair))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddRoleRequest {
    user_id: String,
    role: String,
}

async fn add_role_to_user(
    State(state): State<AuthState>,
    Json(payload): Json<AddRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&payload.user_id)?;
    let role = parse_role(&payload.role)?;

    state.service.add_role_to_user(&payload.user_id, role).await?;

    Ok(StatusCode::CREATED)
}
