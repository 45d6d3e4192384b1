//! Post repository
//!
//! Listings are described by a [`PostQuery`] and filtered, counted and
//! ordered in SQL. Every listed post carries the number of its published
//! comments; order is newest `pub_date` first, ties by ascending id.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Post, PostInput, PostQuery, PostWithMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const POST_COLUMNS: &str = "p.id, p.title, p.text, p.pub_date, p.is_published, p.image, p.author_id, p.category_id, p.location_id, p.created_at";

const META_JOINS: &str = r#"
    JOIN users u ON u.id = p.author_id
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const META_COLUMNS: &str = r#"
    u.username AS author_username,
    c.title AS category_title,
    c.slug AS category_slug,
    c.is_published AS category_is_published,
    CASE WHEN l.is_published = 1 THEN l.name ELSE NULL END AS location_name,
    (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id AND cm.is_published = 1) AS comment_count
"#;

/// Binds the placeholders of [`PostQuery::where_clause`] in order.
macro_rules! bind_post_query {
    ($query:expr, $post_query:expr) => {{
        let mut query = $query;
        if let Some(id) = $post_query.scope_id() {
            query = query.bind(id);
        }
        if let Some(now) = $post_query.now() {
            query = query.bind(now);
        }
        query
    }};
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// A single post with author, category, location and comment count
    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Overwrite the post's fields. A `None` image keeps the stored one.
    async fn update(&self, id: i64, input: &PostInput) -> Result<Option<Post>>;

    /// Delete a post and its comments
    async fn delete(&self, id: i64) -> Result<bool>;

    /// One slice of a listing
    async fn list(&self, query: &PostQuery, offset: i64, limit: i64) -> Result<Vec<PostWithMeta>>;

    /// Total size of a listing
    async fn count(&self, query: &PostQuery) -> Result<i64>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        let sql = r#"
            INSERT INTO posts (title, text, pub_date, is_published, image, author_id, category_id, location_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.pub_date)
                .bind(input.is_published)
                .bind(&input.image)
                .bind(author_id)
                .bind(input.category_id)
                .bind(input.location_id)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create post")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.pub_date)
                .bind(input.is_published)
                .bind(&input.image)
                .bind(author_id)
                .bind(input.category_id)
                .bind(input.location_id)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create post")?
                .last_insert_id() as i64,
        };

        Ok(Post {
            id,
            title: input.title.clone(),
            text: input.text.clone(),
            pub_date: input.pub_date,
            is_published: input.is_published,
            image: input.image.clone(),
            author_id,
            category_id: input.category_id,
            location_id: input.location_id,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS);
        let post = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get post")?
                .map(|row| row_to_post_sqlite(&row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get post")?
                .map(|row| row_to_post_mysql(&row)),
        };
        Ok(post)
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>> {
        let sql = format!(
            "SELECT {}, {} FROM posts p {} WHERE p.id = ?",
            POST_COLUMNS, META_COLUMNS, META_JOINS
        );
        let post = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get post")?
                .map(|row| row_to_post_with_meta_sqlite(&row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get post")?
                .map(|row| row_to_post_with_meta_mysql(&row)),
        };
        Ok(post)
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<Option<Post>> {
        let sql = r#"
            UPDATE posts
            SET title = ?, text = ?, pub_date = ?, is_published = ?, image = COALESCE(?, image),
                category_id = ?, location_id = ?
            WHERE id = ?
        "#;
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.pub_date)
                .bind(input.is_published)
                .bind(&input.image)
                .bind(input.category_id)
                .bind(input.location_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.pub_date)
                .bind(input.is_published)
                .bind(&input.image)
                .bind(input.category_id)
                .bind(input.location_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list(&self, query: &PostQuery, offset: i64, limit: i64) -> Result<Vec<PostWithMeta>> {
        let sql = format!(
            "SELECT {}, {} FROM posts p {} {} ORDER BY p.pub_date DESC, p.id ASC LIMIT ? OFFSET ?",
            POST_COLUMNS,
            META_COLUMNS,
            META_JOINS,
            query.where_clause()
        );

        let posts = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_post_query!(sqlx::query(&sql), query)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list posts")?
                .iter()
                .map(row_to_post_with_meta_sqlite)
                .collect(),
            DatabaseDriver::Mysql => bind_post_query!(sqlx::query(&sql), query)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list posts")?
                .iter()
                .map(row_to_post_with_meta_mysql)
                .collect(),
        };
        Ok(posts)
    }

    async fn count(&self, query: &PostQuery) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM posts p JOIN categories c ON c.id = p.category_id {}",
            query.where_clause()
        );
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                bind_post_query!(sqlx::query_scalar(&sql), query)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                bind_post_query!(sqlx::query_scalar(&sql), query)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count posts")?;
        Ok(count)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        is_published: row.get("is_published"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        location_id: row.get("location_id"),
        created_at: row.get("created_at"),
    }
}

fn row_to_post_with_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> PostWithMeta {
    PostWithMeta {
        post: row_to_post_sqlite(row),
        author_username: row.get("author_username"),
        category_title: row.get("category_title"),
        category_slug: row.get("category_slug"),
        category_is_published: row.get("category_is_published"),
        location_name: row.get("location_name"),
        comment_count: row.get("comment_count"),
    }
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        is_published: row.get("is_published"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        location_id: row.get("location_id"),
        created_at: row.get("created_at"),
    }
}

fn row_to_post_with_meta_mysql(row: &sqlx::mysql::MySqlRow) -> PostWithMeta {
    PostWithMeta {
        post: row_to_post_mysql(row),
        author_username: row.get("author_username"),
        category_title: row.get("category_title"),
        category_slug: row.get("category_slug"),
        category_is_published: row.get("category_is_published"),
        location_name: row.get("location_name"),
        comment_count: row.get("comment_count"),
    }
}
