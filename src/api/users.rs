use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::parse_role;
use super::error::{ApiError, ResultExt, validate_email, validate_uuid};
use crate::auth::{Auth, GuardChain};
use crate::db::{Database, Role, User};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
}

pub fn router(state: UsersState, guards: &GuardChain) -> Router {
    guards
        .protect(
            Router::new()
                .route("/user", get(list_users))
                .route(
                    "/user/{id}",
                    get(get_user).patch(update_user).delete(delete_user),
                ),
        )
        .with_state(state)
}

const USER_NOT_FOUND: &str = "User with this id not exist!";

/// Account with its roles, as returned to administrators.
#[derive(Serialize)]
struct UserView {
    #[serde(flatten)]
    user: User,
    roles: Vec<Role>,
}

async fn view(db: &Database, user: User) -> Result<UserView, ApiError> {
    let roles = db
        .roles()
        .roles_of(&user.id)
        .await
        .db_err("Failed to load roles")?;
    Ok(UserView { user, roles })
}

async fn list_users(State(state): State<UsersState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(view(&state.db, user).await?);
    }

    Ok(Json(views))
}

async fn get_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

    Ok(Json(view(&state.db, user).await?))
}

#[derive(Deserialize)]
struct UpdateUserRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
}

async fn update_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let email = payload.email.as_deref().map(str::trim);
    if let Some(email) = email {
        validate_email(email)?;
    }

    let roles = payload
        .roles
        .map(|names| {
            names
                .iter()
                .map(|name| parse_role(name))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let updated = state
        .db
        .users()
        .update(&id, email, roles.as_deref())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("User already exist!".into())
            }
            e => ApiError::db_error("Failed to update user", e),
        })?;

    if !updated {
        return Err(ApiError::not_found(USER_NOT_FOUND));
    }

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

    info!(user_id = %id, "User updated");
    Ok(Json(view(&state.db, user).await?))
}

async fn delete_user(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    if !auth.owns_or(&id, &[Role::Admin]) {
        return Err(ApiError::forbidden("This is not your profile!"));
    }

    let deleted = state
        .db
        .users()
        .delete(&id)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found(USER_NOT_FOUND));
    }

    info!(user_id = %id, by = %auth.id(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
