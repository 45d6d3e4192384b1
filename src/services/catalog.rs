//! Reference data: categories and locations
//!
//! Staff-only management behind the JSON admin API. Titles and names are
//! required, at most 256 characters; category slugs are unique and limited
//! to latin letters, digits, hyphens and underscores.

use crate::db::repositories::{CategoryRepository, LocationRepository};
use crate::forms::MAX_TITLE_LENGTH;
use crate::models::{
    CatalogFilter, Category, CreateCategoryInput, CreateLocationInput, Location,
    UpdateCategoryInput, UpdateLocationInput,
};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

pub const MAX_SLUG_LENGTH: usize = 64;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|e| panic!("slug pattern: {e}")));

#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already taken, or the row is still referenced
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
}

fn validate_title(field: &str, value: &str) -> Result<String, CatalogServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogServiceError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    if value.chars().count() > MAX_TITLE_LENGTH {
        return Err(CatalogServiceError::ValidationError(format!(
            "{} must be at most {} characters",
            field, MAX_TITLE_LENGTH
        )));
    }
    Ok(value.to_string())
}

fn validate_slug(slug: &str) -> Result<String, CatalogServiceError> {
    let slug = slug.trim();
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH || !SLUG_RE.is_match(slug) {
        return Err(CatalogServiceError::ValidationError(format!(
            "Slug must be 1-{} characters of latin letters, digits, hyphens and underscores",
            MAX_SLUG_LENGTH
        )));
    }
    Ok(slug.to_string())
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
    ) -> Self {
        Self {
            categories,
            locations,
        }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn list_categories(
        &self,
        filter: &CatalogFilter,
    ) -> Result<Vec<Category>, CatalogServiceError> {
        let categories = self
            .categories
            .list(filter)
            .await
            .context("Failed to list categories")?;
        Ok(categories)
    }

    pub async fn get_category(&self, id: i64) -> Result<Category, CatalogServiceError> {
        self.categories
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CatalogServiceError::NotFound("Category"))
    }

    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<Category, CatalogServiceError> {
        let input = CreateCategoryInput {
            title: validate_title("Title", &input.title)?,
            slug: validate_slug(&input.slug)?,
            description: input.description.trim().to_string(),
            is_published: input.is_published,
        };
        self.ensure_slug_free(&input.slug, None).await?;

        let category = self
            .categories
            .create(&input)
            .await
            .context("Failed to create category")?;

        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Category, CatalogServiceError> {
        let mut category = self.get_category(id).await?;

        if let Some(title) = input.title {
            category.title = validate_title("Title", &title)?;
        }
        if let Some(slug) = input.slug {
            let slug = validate_slug(&slug)?;
            self.ensure_slug_free(&slug, Some(id)).await?;
            category.slug = slug;
        }
        if let Some(description) = input.description {
            category.description = description.trim().to_string();
        }
        if let Some(is_published) = input.is_published {
            category.is_published = is_published;
        }

        let updated = self
            .categories
            .update(&category)
            .await
            .context("Failed to update category")?;
        Ok(updated)
    }

    /// Delete a category that no post uses
    pub async fn delete_category(&self, id: i64) -> Result<(), CatalogServiceError> {
        self.get_category(id).await?;

        let posts = self
            .categories
            .count_posts(id)
            .await
            .context("Failed to count category posts")?;
        if posts > 0 {
            return Err(CatalogServiceError::Conflict(format!(
                "Category is used by {} post(s)",
                posts
            )));
        }

        self.categories
            .delete(id)
            .await
            .context("Failed to delete category")?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    async fn ensure_slug_free(
        &self,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<(), CatalogServiceError> {
        let taken = self
            .categories
            .exists_by_slug(slug, exclude_id)
            .await
            .context("Failed to check category slug")?;
        if taken {
            return Err(CatalogServiceError::Conflict(format!(
                "Slug '{}' is already in use",
                slug
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Locations
    // ========================================================================

    pub async fn list_locations(
        &self,
        filter: &CatalogFilter,
    ) -> Result<Vec<Location>, CatalogServiceError> {
        let locations = self
            .locations
            .list(filter)
            .await
            .context("Failed to list locations")?;
        Ok(locations)
    }

    pub async fn get_location(&self, id: i64) -> Result<Location, CatalogServiceError> {
        self.locations
            .get_by_id(id)
            .await
            .context("Failed to get location")?
            .ok_or(CatalogServiceError::NotFound("Location"))
    }

    pub async fn create_location(
        &self,
        input: CreateLocationInput,
    ) -> Result<Location, CatalogServiceError> {
        let input = CreateLocationInput {
            name: validate_title("Name", &input.name)?,
            is_published: input.is_published,
        };

        let location = self
            .locations
            .create(&input)
            .await
            .context("Failed to create location")?;
        Ok(location)
    }

    pub async fn update_location(
        &self,
        id: i64,
        input: UpdateLocationInput,
    ) -> Result<Location, CatalogServiceError> {
        let mut location = self.get_location(id).await?;

        if let Some(name) = input.name {
            location.name = validate_title("Name", &name)?;
        }
        if let Some(is_published) = input.is_published {
            location.is_published = is_published;
        }

        let updated = self
            .locations
            .update(&location)
            .await
            .context("Failed to update location")?;
        Ok(updated)
    }

    /// Delete a location; posts that used it keep no location
    pub async fn delete_location(&self, id: i64) -> Result<(), CatalogServiceError> {
        self.get_location(id).await?;
        self.locations
            .delete(id)
            .await
            .context("Failed to delete location")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxLocationRepository};
    use crate::db::test_support::{insert_post, insert_user, migrated_pool};
    use crate::db::DynDatabasePool;
    use chrono::Utc;

    fn service(pool: &DynDatabasePool) -> CatalogService {
        CatalogService::new(
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxLocationRepository::boxed(pool.clone()),
        )
    }

    fn category(title: &str, slug: &str) -> CreateCategoryInput {
        CreateCategoryInput {
            title: title.into(),
            slug: slug.into(),
            description: String::new(),
            is_published: true,
        }
    }

    #[test]
    fn test_validate_slug() {
        assert_eq!(validate_slug(" travel_2024 ").unwrap(), "travel_2024");
        assert!(validate_slug("").is_err());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("путешествия").is_err());
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_category_lifecycle() {
        let pool = migrated_pool().await;
        let service = service(&pool);

        let created = service
            .create_category(category(" Travel ", "travel"))
            .await
            .unwrap();
        assert_eq!(created.title, "Travel");

        let updated = service
            .update_category(
                created.id,
                UpdateCategoryInput {
                    is_published: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_published);
        assert_eq!(updated.slug, "travel");

        service.delete_category(created.id).await.unwrap();
        assert!(matches!(
            service.get_category(created.id).await,
            Err(CatalogServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_category_conflicts() {
        let pool = migrated_pool().await;
        let service = service(&pool);
        let travel = service
            .create_category(category("Travel", "travel"))
            .await
            .unwrap();
        let food = service
            .create_category(category("Food", "food"))
            .await
            .unwrap();

        assert!(matches!(
            service.create_category(category("Again", "travel")).await,
            Err(CatalogServiceError::Conflict(_))
        ));
        assert!(matches!(
            service
                .update_category(
                    food.id,
                    UpdateCategoryInput {
                        slug: Some("travel".into()),
                        ..Default::default()
                    },
                )
                .await,
            Err(CatalogServiceError::Conflict(_))
        ));

        let author = insert_user(&pool, "author").await;
        insert_post(&pool, author, travel.id, Utc::now(), true).await;
        assert!(matches!(
            service.delete_category(travel.id).await,
            Err(CatalogServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_location_lifecycle() {
        let pool = migrated_pool().await;
        let service = service(&pool);

        assert!(matches!(
            service
                .create_location(CreateLocationInput {
                    name: "  ".into(),
                    is_published: true,
                })
                .await,
            Err(CatalogServiceError::ValidationError(_))
        ));

        let harbour = service
            .create_location(CreateLocationInput {
                name: "Harbour".into(),
                is_published: true,
            })
            .await
            .unwrap();
        let renamed = service
            .update_location(
                harbour.id,
                UpdateLocationInput {
                    name: Some("Old Harbour".into()),
                    is_published: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Old Harbour");

        let found = service
            .list_locations(&CatalogFilter {
                is_published: None,
                search: Some("old".into()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        service.delete_location(harbour.id).await.unwrap();
        assert!(matches!(
            service.delete_location(harbour.id).await,
            Err(CatalogServiceError::NotFound(_))
        ));
    }
}
