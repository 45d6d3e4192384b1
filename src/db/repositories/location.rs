//! Location repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CatalogFilter, CreateLocationInput, Location};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, input: &CreateLocationInput) -> Result<Location>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// List locations ordered by id
    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Location>>;

    async fn update(&self, location: &Location) -> Result<Location>;

    /// Delete a location; posts that referenced it keep existing without one
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &CreateLocationInput) -> Result<Location> {
        let sql = "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create location")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create location")?
                .last_insert_id() as i64,
        };

        Ok(Location {
            id,
            name: input.name.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        let sql = format!("SELECT {} FROM locations WHERE id = ?", LOCATION_COLUMNS);
        let location = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get location")?
                .map(|row| row_to_location_sqlite(&row)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get location")?
                .map(|row| row_to_location_mysql(&row)),
        };
        Ok(location)
    }

    async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Location>> {
        let sql = format!(
            "SELECT {} FROM locations {} ORDER BY id",
            LOCATION_COLUMNS,
            filter.where_clause("name")
        );
        let pattern = filter.search_pattern();

        let locations = match self.pool.driver() {
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
                    .context("Failed to list locations")?
                    .iter()
                    .map(row_to_location_sqlite)
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
                    .context("Failed to list locations")?
                    .iter()
                    .map(row_to_location_mysql)
                    .collect()
            }
        };
        Ok(locations)
    }

    async fn update(&self, location: &Location) -> Result<Location> {
        let sql = "UPDATE locations SET name = ?, is_published = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&location.name)
                    .bind(location.is_published)
                    .bind(location.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update location")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&location.name)
                    .bind(location.is_published)
                    .bind(location.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update location")?;
            }
        }

        self.get_by_id(location.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Location not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM locations WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete location")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete location")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

fn row_to_location_mysql(row: &sqlx::mysql::MySqlRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;

    fn input(name: &str, is_published: bool) -> CreateLocationInput {
        CreateLocationInput {
            name: name.to_string(),
            is_published,
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let repo = SqlxLocationRepository::new(migrated_pool().await);
        let mut lisbon = repo.create(&input("Lisbon", true)).await.unwrap();
        assert_eq!(repo.get_by_id(lisbon.id).await.unwrap().unwrap().name, "Lisbon");

        lisbon.name = "Porto".into();
        lisbon.is_published = false;
        let updated = repo.update(&lisbon).await.unwrap();
        assert_eq!(updated.name, "Porto");
        assert!(!updated.is_published);

        assert!(repo.delete(lisbon.id).await.unwrap());
        assert!(repo.get_by_id(lisbon.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = SqlxLocationRepository::new(migrated_pool().await);
        repo.create(&input("Lisbon", true)).await.unwrap();
        repo.create(&input("Lille", false)).await.unwrap();
        repo.create(&input("Oslo", true)).await.unwrap();

        let hidden = repo
            .list(&CatalogFilter { is_published: Some(false), search: None })
            .await
            .unwrap();
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].name, "Lille");

        let search = repo
            .list(&CatalogFilter { is_published: None, search: Some("li".into()) })
            .await
            .unwrap();
        let names: Vec<_> = search.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Lisbon", "Lille"]);
    }
}
