use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ResultExt, require_non_empty, validate_uuid};
use crate::auth::{Auth, AuthenticatedUser, GuardChain};
use crate::db::{Article, Database, Role};

#[derive(Clone)]
pub struct ArticlesState {
    pub db: Database,
}

pub fn router(state: ArticlesState, guards: &GuardChain) -> Router {
    guards
        .protect(
            Router::new()
                .route("/article", get(list_articles).post(create_article))
                .route(
                    "/article/{id}",
                    get(get_article)
                        .patch(update_article)
                        .delete(delete_article),
                )
                .route("/article/user/{userId}", get(list_user_articles)),
        )
        .with_state(state)
}

const ARTICLE_NOT_FOUND: &str = "Article with this id not exist!";
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// Roles allowed to modify articles they do not own.
const UNRESTRICTED: &[Role] = &[Role::Admin];

#[derive(Deserialize)]
struct ArticleRequest {
    title: String,
    body: String,
}

impl ArticleRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_non_empty(&self.title, "title")?;
        require_non_empty(&self.body, "body")
    }
}

async fn create_article(
    State(state): State<ArticlesState>,
    Auth(auth): Auth,
    Json(payload): Json<ArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let article = state
        .db
        .articles()
        .create(auth.id(), &payload.title, &payload.body)
        .await
        .db_err("Failed to create article")?;

    info!(article_id = %article.id, user_id = %auth.id(), "Article created");
    Ok((StatusCode::CREATED, Json(article)))
}

#[derive(Deserialize)]
struct PaginationQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaginationMeta {
    total_items: i64,
    item_count: usize,
    items_per_page: u32,
    total_pages: i64,
    current_page: u32,
}

#[derive(Serialize)]
struct ArticlePage {
    items: Vec<Article>,
    meta: PaginationMeta,
}

async fn list_articles(
    State(state): State<ArticlesState>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    if page < 1 {
        return Err(ApiError::bad_request("page must not be less than 1"));
    }
    if limit < 1 {
        return Err(ApiError::bad_request("limit must not be less than 1"));
    }
    if limit > MAX_PAGE_SIZE {
        return Err(ApiError::bad_request("limit must not be greater than 100"));
    }

    let (items, total_items) = state
        .db
        .articles()
        .paginate(page, limit)
        .await
        .db_err("Failed to list articles")?;

    let meta = PaginationMeta {
        total_items,
        item_count: items.len(),
        items_per_page: limit,
        total_pages: (total_items + i64::from(limit) - 1) / i64::from(limit),
        current_page: page,
    };

    Ok(Json(ArticlePage { items, meta }))
}

async fn get_article(
    State(state): State<ArticlesState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;
    Ok(Json(find_article(&state.db, &id).await?))
}

async fn list_user_articles(
    State(state): State<ArticlesState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&user_id)?;

    let exists = state
        .db
        .users()
        .exists(&user_id)
        .await
        .db_err("Failed to look up user")?;

    if !exists {
        return Err(ApiError::not_found("User with this id not exist!"));
    }

    let articles = state
        .db
        .articles()
        .list_by_user(&user_id)
        .await
        .db_err("Failed to list articles")?;

    Ok(Json(articles))
}

async fn update_article(
    State(state): State<ArticlesState>,
    Auth(auth): Auth,
    Path(id): Path<String>,
    Json(payload): Json<ArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;
    payload.validate()?;

    check_ownership(&state.db, &auth, &id).await?;

    state
        .db
        .articles()
        .update(&id, &payload.title, &payload.body)
        .await
        .db_err("Failed to update article")?;

    Ok(Json(find_article(&state.db, &id).await?))
}

async fn delete_article(
    State(state): State<ArticlesState>,
    Auth(auth): Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    check_ownership(&state.db, &auth, &id).await?;

    state
        .db
        .articles()
        .delete(&id)
        .await
        .db_err("Failed to delete article")?;

    info!(article_id = %id, by = %auth.id(), "Article deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_article(db: &Database, id: &str) -> Result<Article, ApiError> {
    db.articles()
        .get(id)
        .await
        .db_err("Failed to get article")?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))
}

/// NotFound if the article is absent, Forbidden unless `auth` may modify it.
async fn check_ownership(
    db: &Database,
    auth: &AuthenticatedUser,
    id: &str,
) -> Result<(), ApiError> {
    let owner = db
        .articles()
        .owner_of(id)
        .await
        .db_err("Failed to get article")?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    if auth.owns_or(&owner, UNRESTRICTED) {
        Ok(())
    } else {
        Err(ApiError::forbidden("This is not your article!"))
    }
}
