//! Post service
//!
//! Feeds (home, category, author), the detail page, and the owner-only
//! create/edit/delete operations.

use crate::db::repositories::{CategoryRepository, LocationRepository, PostRepository};
use crate::forms::{FormErrors, PostForm};
use crate::models::{
    CatalogFilter, Category, Location, Page, Paginator, Post, PostInput, PostQuery, PostScope,
    PostWithMeta, User, Viewer,
};
use crate::services::visibility::can_view;
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Missing, or hidden from this viewer
    #[error("Post not found")]
    NotFound,

    #[error("Post {post_id} belongs to another user")]
    NotOwner { post_id: i64 },

    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Options for the category and location selects of the post form
#[derive(Debug, Clone, Serialize)]
pub struct FormChoices {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    paginator: Paginator,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            categories,
            locations,
            paginator,
        }
    }

    /// Home page: every publicly visible post
    pub async fn feed(&self, page: Option<&str>) -> Result<Page<PostWithMeta>, PostServiceError> {
        self.list_page(PostQuery::public(PostScope::All, Utc::now()), page)
            .await
    }

    /// Publicly visible posts of a published category
    pub async fn category_feed(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<(Category, Page<PostWithMeta>), PostServiceError> {
        let category = self
            .categories
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .filter(|c| c.is_published)
            .ok_or(PostServiceError::NotFound)?;

        let page = self
            .list_page(
                PostQuery::public(PostScope::Category(category.id), Utc::now()),
                page,
            )
            .await?;
        Ok((category, page))
    }

    /// An author's posts: all of them for the author, the public ones for
    /// anyone else
    pub async fn author_feed(
        &self,
        author: &User,
        viewer: &Viewer,
        page: Option<&str>,
    ) -> Result<Page<PostWithMeta>, PostServiceError> {
        let scope = PostScope::Author(author.id);
        let query = if viewer.is(author.id) {
            PostQuery::unfiltered(scope)
        } else {
            PostQuery::public(scope, Utc::now())
        };
        self.list_page(query, page).await
    }

    /// A single post, if this viewer may see it
    pub async fn detail(&self, id: i64, viewer: &Viewer) -> Result<PostWithMeta, PostServiceError> {
        let post = self
            .posts
            .get_with_meta(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        if can_view(viewer, &post, Utc::now()) {
            Ok(post)
        } else {
            tracing::debug!(post_id = id, viewer = ?viewer.id(), "Hidden post requested");
            Err(PostServiceError::NotFound)
        }
    }

    pub async fn form_choices(&self) -> Result<FormChoices, PostServiceError> {
        let filter = CatalogFilter::default();
        let categories = self
            .categories
            .list(&filter)
            .await
            .context("Failed to list categories")?;
        let locations = self
            .locations
            .list(&filter)
            .await
            .context("Failed to list locations")?;
        Ok(FormChoices {
            categories,
            locations,
        })
    }

    /// Validate a submitted form, including that the chosen category and
    /// location exist. The returned input carries no image.
    pub async fn validate(&self, form: &PostForm) -> Result<PostInput, PostServiceError> {
        let clean = form.clean().map_err(PostServiceError::ValidationError)?;
        let mut errors = FormErrors::new();

        let category = self
            .categories
            .get_by_id(clean.category_id)
            .await
            .context("Failed to get category")?;
        if category.is_none() {
            errors.add("category", "Select a valid choice.");
        }

        if let Some(location_id) = clean.location_id {
            let location = self
                .locations
                .get_by_id(location_id)
                .await
                .context("Failed to get location")?;
            if location.is_none() {
                errors.add("location", "Select a valid choice.");
            }
        }

        if !errors.is_empty() {
            return Err(PostServiceError::ValidationError(errors));
        }

        Ok(PostInput {
            title: clean.title,
            text: clean.text,
            pub_date: clean.pub_date,
            is_published: clean.is_published,
            category_id: clean.category_id,
            location_id: clean.location_id,
            image: None,
        })
    }

    pub async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post, PostServiceError> {
        let post = self
            .posts
            .create(author_id, input)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = post.id, author_id, "Post created");
        Ok(post)
    }

    /// The post, provided the viewer wrote it
    pub async fn owned(&self, id: i64, viewer: &Viewer) -> Result<Post, PostServiceError> {
        let post = self
            .posts
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        if viewer.is(post.author_id) {
            Ok(post)
        } else {
            tracing::debug!(post_id = id, viewer = ?viewer.id(), "Post mutation denied");
            Err(PostServiceError::NotOwner { post_id: id })
        }
    }

    pub async fn update(
        &self,
        id: i64,
        viewer: &Viewer,
        input: &PostInput,
    ) -> Result<Post, PostServiceError> {
        self.owned(id, viewer).await?;

        self.posts
            .update(id, input)
            .await
            .context("Failed to update post")?
            .ok_or(PostServiceError::NotFound)
    }

    /// Delete the viewer's own post; its comments go with it
    pub async fn delete(&self, id: i64, viewer: &Viewer) -> Result<Post, PostServiceError> {
        let post = self.owned(id, viewer).await?;

        let deleted = self
            .posts
            .delete(id)
            .await
            .context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound);
        }

        tracing::info!(post_id = id, "Post deleted");
        Ok(post)
    }

    async fn list_page(
        &self,
        query: PostQuery,
        requested: Option<&str>,
    ) -> Result<Page<PostWithMeta>, PostServiceError> {
        let total = self
            .posts
            .count(&query)
            .await
            .context("Failed to count posts")?;
        let window = self.paginator.window(total, requested);
        let items = self
            .posts
            .list(&query, window.offset, window.limit)
            .await
            .context("Failed to list posts")?;

        Ok(Page::new(items, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository,
    };
    use crate::db::test_support::{
        insert_category, insert_comment, insert_location, insert_post, insert_user, migrated_pool,
    };
    use crate::db::DynDatabasePool;
    use chrono::Duration;

    fn service(pool: &DynDatabasePool) -> PostService {
        PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxLocationRepository::boxed(pool.clone()),
            Paginator::new(10),
        )
    }

    fn viewer(id: i64, username: &str) -> Viewer {
        let mut user = User::new(username.into(), String::new(), "hash".into(), false);
        user.id = id;
        Viewer::authenticated(user)
    }

    fn form(category: i64) -> PostForm {
        PostForm {
            title: "Trip".into(),
            text: "North".into(),
            pub_date: "2024-01-01T09:00".into(),
            category: category.to_string(),
            location: String::new(),
            is_published: Some("on".into()),
        }
    }

    #[tokio::test]
    async fn test_feed_paginates_twenty_five_posts() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let category = insert_category(&pool, "travel", true).await;
        let start = Utc::now() - Duration::days(30);
        for i in 0..25 {
            insert_post(&pool, author, category, start + Duration::hours(i), true).await;
        }
        let service = service(&pool);

        let first = service.feed(None).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert!(first.has_next);
        assert_eq!(first.num_pages, 3);

        let third = service.feed(Some("3")).await.unwrap();
        assert_eq!(third.items.len(), 5);
        assert!(!third.has_next);

        let clamped = service.feed(Some("99")).await.unwrap();
        assert_eq!(clamped.number, 3);
        assert_eq!(clamped.items.len(), 5);

        let junk = service.feed(Some("abc")).await.unwrap();
        assert_eq!(junk.number, 1);
    }

    #[tokio::test]
    async fn test_category_feed_hides_unpublished_category() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let open = insert_category(&pool, "open", true).await;
        insert_category(&pool, "closed", false).await;
        insert_post(&pool, author, open, Utc::now() - Duration::hours(1), true).await;
        let service = service(&pool);

        let (category, page) = service.category_feed("open", None).await.unwrap();
        assert_eq!(category.id, open);
        assert_eq!(page.total, 1);

        assert!(matches!(
            service.category_feed("closed", None).await,
            Err(PostServiceError::NotFound)
        ));
        assert!(matches!(
            service.category_feed("missing", None).await,
            Err(PostServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_author_feed_depends_on_viewer() {
        let pool = migrated_pool().await;
        let author_id = insert_user(&pool, "author").await;
        let category = insert_category(&pool, "travel", true).await;
        insert_post(&pool, author_id, category, Utc::now() - Duration::hours(1), true).await;
        insert_post(&pool, author_id, category, Utc::now() + Duration::days(1), true).await;
        insert_post(&pool, author_id, category, Utc::now() - Duration::hours(1), false).await;
        let service = service(&pool);

        let author = viewer(author_id, "author");
        let user = author.user().cloned().unwrap();

        let own = service.author_feed(&user, &author, None).await.unwrap();
        assert_eq!(own.total, 3);

        let other = service
            .author_feed(&user, &Viewer::anonymous(), None)
            .await
            .unwrap();
        assert_eq!(other.total, 1);
    }

    #[tokio::test]
    async fn test_future_post_detail() {
        let pool = migrated_pool().await;
        let a = insert_user(&pool, "a").await;
        let b = insert_user(&pool, "b").await;
        let category = insert_category(&pool, "travel", true).await;
        let post = insert_post(&pool, a, category, Utc::now() + Duration::days(1), true).await;
        let service = service(&pool);

        assert!(matches!(
            service.detail(post, &viewer(b, "b")).await,
            Err(PostServiceError::NotFound)
        ));
        let seen = service.detail(post, &viewer(a, "a")).await.unwrap();
        assert_eq!(seen.post.id, post);
    }

    #[tokio::test]
    async fn test_detail_counts_published_comments() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let category = insert_category(&pool, "travel", true).await;
        let post = insert_post(&pool, author, category, Utc::now() - Duration::hours(1), true).await;
        insert_comment(&pool, post, author, true).await;
        insert_comment(&pool, post, author, true).await;
        insert_comment(&pool, post, author, false).await;

        let detail = service(&pool)
            .detail(post, &Viewer::anonymous())
            .await
            .unwrap();
        assert_eq!(detail.comment_count, 2);
    }

    #[tokio::test]
    async fn test_validate_checks_references() {
        let pool = migrated_pool().await;
        let category = insert_category(&pool, "travel", true).await;
        let location = insert_location(&pool, "Harbour", true).await;
        let service = service(&pool);

        let mut ok = form(category);
        ok.location = location.to_string();
        let input = service.validate(&ok).await.unwrap();
        assert_eq!(input.location_id, Some(location));
        assert!(input.image.is_none());

        let mut bad = form(category + 100);
        bad.location = (location + 100).to_string();
        match service.validate(&bad).await {
            Err(PostServiceError::ValidationError(errors)) => {
                assert!(errors.has("category"));
                assert!(errors.has("location"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_only_owner_mutates() {
        let pool = migrated_pool().await;
        let a = insert_user(&pool, "a").await;
        let b = insert_user(&pool, "b").await;
        let category = insert_category(&pool, "travel", true).await;
        let service = service(&pool);

        let input = service.validate(&form(category)).await.unwrap();
        let post = service.create(a, &input).await.unwrap();
        assert_eq!(post.author_id, a);

        let mut changed = input.clone();
        changed.title = "Changed".into();
        assert!(matches!(
            service.update(post.id, &viewer(b, "b"), &changed).await,
            Err(PostServiceError::NotOwner { .. })
        ));
        assert!(matches!(
            service.delete(post.id, &Viewer::anonymous()).await,
            Err(PostServiceError::NotOwner { .. })
        ));

        let updated = service
            .update(post.id, &viewer(a, "a"), &changed)
            .await
            .unwrap();
        assert_eq!(updated.title, "Changed");

        service.delete(post.id, &viewer(a, "a")).await.unwrap();
        assert!(matches!(
            service.owned(post.id, &viewer(a, "a")).await,
            Err(PostServiceError::NotFound)
        ));
    }
}
