//! Category repository
//!
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CatalogFilter, Category, CreateCategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const CATEGORY_COLUMNS: &str = "id, title, slug, description, is_published, created_at";

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List categories ordered by id
    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Category>>;

    /// Persist every field of `category`
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category. Fails while posts still reference it.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Whether another category already uses `slug`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Number of posts filed under the category
    async fn count_posts(&self, id: i64) -> Result<i64>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, condition: &str, value: SqlValue<'_>) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE {}", CATEGORY_COLUMNS, condition);
        let category = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql);
                let query = match value {
                    SqlValue::Id(id) => query.bind(id),
                    SqlValue::Text(text) => query.bind(text),
                };
                query
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get category")?
                    .map(|row| row_to_category_sqlite(&row))
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql);
                let query = match value {
                    SqlValue::Id(id) => query.bind(id),
                    SqlValue::Text(text) => query.bind(text),
                };
                query
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get category")?
                    .map(|row| row_to_category_mysql(&row))
            }
        };
        Ok(category)
    }
}

enum SqlValue<'a> {
    Id(i64),
    Text(&'a str),
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category> {
        let sql = r#"
            INSERT INTO categories (title, slug, description, is_published, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.slug)
                .bind(&input.description)
                .bind(input.is_published)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create category")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.slug)
                .bind(&input.description)
                .bind(input.is_published)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create category")?
                .last_insert_id() as i64,
        };

        Ok(Category {
            id,
            title: input.title.clone(),
            slug: input.slug.clone(),
            description: input.description.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        self.fetch_one_where("id = ?", SqlValue::Id(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.fetch_one_where("slug = ?", SqlValue::Text(slug)).await
    }

    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories {} ORDER BY id",
            CATEGORY_COLUMNS,
            filter.where_clause("title")
        );
        let pattern = filter.search_pattern();

        let categories = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                if let Some(published) = filter.is_published {
                    query = query.bind(published);
                }
                if let Some(pattern) = &pattern {
                    query = query.bind(pattern);
                }
                query
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list categories")?
                    .iter()
                    .map(row_to_category_sqlite)
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                if let Some(published) = filter.is_published {
                    query = query.bind(published);
                }
                if let Some(pattern) = &pattern {
                    query = query.bind(pattern);
                }
                query
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list categories")?
                    .iter()
                    .map(row_to_category_mysql)
                    .collect()
            }
        };
        Ok(categories)
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        let sql = "UPDATE categories SET title = ?, slug = ?, description = ?, is_published = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&category.title)
                    .bind(&category.slug)
                    .bind(&category.description)
                    .bind(category.is_published)
                    .bind(category.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update category")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&category.title)
                    .bind(&category.slug)
                    .bind(&category.description)
                    .bind(category.is_published)
                    .bind(category.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update category")?;
            }
        }

        self.get_by_id(category.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM categories WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM categories WHERE slug = ? AND id <> ?";
        let exclude = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(self.pool.sqlite()?)
                .await,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(self.pool.mysql()?)
                .await,
        }
        .context("Failed to check category slug")?;
        Ok(count > 0)
    }

    async fn count_posts(&self, id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM posts WHERE category_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql)
                .bind(id)
                .fetch_one(self.pool.sqlite()?)
                .await,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql)
                .bind(id)
                .fetch_one(self.pool.mysql()?)
                .await,
        }
        .context("Failed to count category posts")?;
        Ok(count)
    }
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}
