//! Article storage. Every article belongs to exactly one user.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ArticleStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

const ARTICLE_COLUMNS: &str = "id, user_id, title, body, created_at, updated_at";

impl ArticleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new article owned by `user_id`.
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
    ) -> Result<Article, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO articles (id, user_id, title, body) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(user_id)
            .bind(title)
            .bind(body)
            .execute(&self.pool)
            .await?;

        self.get(&id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM articles WHERE id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Owner user ID of an article, if the article exists.
    pub async fn owner_of(&self, id: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT user_id FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Article>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM articles WHERE user_id = ? ORDER BY created_at, rowid",
            ARTICLE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// One page of all articles (1-based `page`) plus the total article count.
    pub async fn paginate(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Article>, i64), sqlx::Error> {
        let offset = i64::from(page.saturating_sub(1)).saturating_mul(i64::from(limit));

        let items: Vec<Article> = sqlx::query_as(&format!(
            "SELECT {} FROM articles ORDER BY created_at, rowid LIMIT ? OFFSET ?",
            ARTICLE_COLUMNS
        ))
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total.0))
    }

    /// Update title and body. Returns false if the article does not exist.
    pub async fn update(&self, id: &str, title: &str, body: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE articles SET title = ?, body = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(title)
        .bind(body)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
