//! Post storage for job listings.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

/// A job listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub price: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied when creating or replacing a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub price: f64,
    pub category_id: Option<i64>,
}

const POST_COLUMNS: &str =
    "id, user_id, category_id, title, content, price, created_at, updated_at";

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a post owned by `user_id`. Returns the post ID.
    pub async fn create(&self, user_id: i64, post: &NewPost) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO posts (user_id, category_id, title, content, price) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(post.category_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.price)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// All posts, newest first.
    pub async fn list_all(&self) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Posts owned by a user, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Replace a post's fields. Only updates if the post belongs to the user.
    pub async fn update(
        &self,
        id: i64,
        user_id: i64,
        post: &NewPost,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET title = ?, content = ?, price = ?, category_id = ?, updated_at = datetime('now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.price)
        .bind(post.category_id)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a post. Only deletes if the post belongs to the user.
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
