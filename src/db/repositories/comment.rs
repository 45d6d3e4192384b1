//! Comment repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const COMMENT_COLUMNS: &str = "cm.id, cm.post_id, cm.author_id, cm.text, cm.is_published, cm.created_at";

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Published comments of a post, oldest first
    async fn list_published_for_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>>;

    async fn update_text(&self, id: i64, text: &str) -> Result<Option<Comment>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let sql = r#"
            INSERT INTO comments (post_id, author_id, text, is_published, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(post_id)
                .bind(author_id)
                .bind(text)
                .bind(true)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(post_id)
                .bind(author_id)
                .bind(text)
                .bind(true)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            post_id,
            author_id,
            text: text.to_string(),
            is_published: true,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments cm WHERE cm.id = ?", COMMENT_COLUMNS);
        let comment = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get comment")?
                .map(|row| row_to_comment_sqlite(&row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get comment")?
                .map(|row| row_to_comment_mysql(&row)),
        };
        Ok(comment)
    }

    async fn list_published_for_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>> {
        let sql = format!(
            r#"
            SELECT {}, u.username AS author_username
            FROM comments cm
            JOIN users u ON u.id = cm.author_id
            WHERE cm.post_id = ? AND cm.is_published = 1
            ORDER BY cm.created_at ASC, cm.id ASC
            "#,
            COMMENT_COLUMNS
        );
        let comments = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(post_id)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(|row| CommentWithMeta {
                    comment: row_to_comment_sqlite(row),
                    author_username: row.get("author_username"),
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(post_id)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(|row| CommentWithMeta {
                    comment: row_to_comment_mysql(row),
                    author_username: row.get("author_username"),
                })
                .collect(),
        };
        Ok(comments)
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Option<Comment>> {
        let sql = "UPDATE comments SET text = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        text: row.get("text"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        text: row.get("text"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}
