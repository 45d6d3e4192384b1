//! Comment service

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::forms::{CommentForm, FormErrors};
use crate::models::{Comment, CommentWithMeta, Viewer};
use crate::services::visibility::can_view;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// The post or comment is missing, the post is hidden from the viewer,
    /// or the comment belongs to a different post
    #[error("Not found")]
    NotFound,

    /// Only logged-in users comment
    #[error("Login required")]
    LoginRequired,

    #[error("Comment {comment_id} on post {post_id} belongs to another user")]
    NotOwner { post_id: i64, comment_id: i64 },

    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Add a comment to a post the viewer can see.
    ///
    /// An empty comment is dropped: the result is `Ok(None)` and nothing is
    /// stored.
    pub async fn add(
        &self,
        post_id: i64,
        viewer: &Viewer,
        form: &CommentForm,
    ) -> Result<Option<Comment>, CommentServiceError> {
        let author_id = viewer.id().ok_or(CommentServiceError::LoginRequired)?;

        let post = self
            .posts
            .get_with_meta(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(CommentServiceError::NotFound)?;
        if !can_view(viewer, &post, Utc::now()) {
            return Err(CommentServiceError::NotFound);
        }

        let Ok(text) = form.clean() else {
            tracing::debug!(post_id, author_id, "Empty comment dropped");
            return Ok(None);
        };

        let comment = self
            .comments
            .create(post_id, author_id, &text)
            .await
            .context("Failed to create comment")?;

        tracing::debug!(comment_id = comment.id, post_id, author_id, "Comment added");
        Ok(Some(comment))
    }

    /// Published comments, oldest first
    pub async fn list_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithMeta>, CommentServiceError> {
        let comments = self
            .comments
            .list_published_for_post(post_id)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }

    /// The comment, provided it sits on `post_id` and the viewer wrote it
    pub async fn owned(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &Viewer,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self
            .comments
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|c| c.post_id == post_id)
            .ok_or(CommentServiceError::NotFound)?;

        if viewer.is(comment.author_id) {
            Ok(comment)
        } else {
            tracing::debug!(comment_id, viewer = ?viewer.id(), "Comment mutation denied");
            Err(CommentServiceError::NotOwner {
                post_id,
                comment_id,
            })
        }
    }

    pub async fn update(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &Viewer,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        self.owned(post_id, comment_id, viewer).await?;
        let text = form.clean().map_err(CommentServiceError::ValidationError)?;

        self.comments
            .update_text(comment_id, &text)
            .await
            .context("Failed to update comment")?
            .ok_or(CommentServiceError::NotFound)
    }

    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &Viewer,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self.owned(post_id, comment_id, viewer).await?;

        let deleted = self
            .comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;
        if !deleted {
            return Err(CommentServiceError::NotFound);
        }
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository};
    use crate::db::test_support::{
        insert_category, insert_comment, insert_post, insert_user, migrated_pool,
    };
    use crate::db::DynDatabasePool;
    use crate::models::User;
    use chrono::Duration;

    fn service(pool: &DynDatabasePool) -> CommentService {
        CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
        )
    }

    fn viewer(id: i64) -> Viewer {
        let mut user = User::new(format!("user{id}"), String::new(), "hash".into(), false);
        user.id = id;
        Viewer::authenticated(user)
    }

    fn text(value: &str) -> CommentForm {
        CommentForm { text: value.into() }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let reader = insert_user(&pool, "reader").await;
        let category = insert_category(&pool, "travel", true).await;
        let post = insert_post(&pool, author, category, Utc::now() - Duration::hours(1), true).await;
        let service = service(&pool);

        let first = service.add(post, &viewer(reader), &text("First!")).await.unwrap();
        assert_eq!(first.map(|c| c.author_id), Some(reader));
        service.add(post, &viewer(author), &text("Thanks")).await.unwrap();

        let listed = service.list_for_post(post).await.unwrap();
        let texts: Vec<&str> = listed.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, vec!["First!", "Thanks"]);
        assert_eq!(listed[0].author_username, "reader");
    }

    #[tokio::test]
    async fn test_add_rules() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let reader = insert_user(&pool, "reader").await;
        let category = insert_category(&pool, "travel", true).await;
        let hidden = insert_post(&pool, author, category, Utc::now() + Duration::days(1), true).await;
        let service = service(&pool);

        assert!(matches!(
            service.add(hidden, &Viewer::anonymous(), &text("hi")).await,
            Err(CommentServiceError::LoginRequired)
        ));
        assert!(matches!(
            service.add(hidden, &viewer(reader), &text("hi")).await,
            Err(CommentServiceError::NotFound)
        ));
        assert!(matches!(
            service.add(hidden + 50, &viewer(reader), &text("hi")).await,
            Err(CommentServiceError::NotFound)
        ));

        // the author may comment on their own scheduled post
        assert!(service
            .add(hidden, &viewer(author), &text("note to self"))
            .await
            .unwrap()
            .is_some());
        assert!(service
            .add(hidden, &viewer(author), &text("   "))
            .await
            .unwrap()
            .is_none());
        assert_eq!(service.list_for_post(hidden).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_comment_is_untouched() {
        let pool = migrated_pool().await;
        let c = insert_user(&pool, "c").await;
        let d = insert_user(&pool, "d").await;
        let category = insert_category(&pool, "travel", true).await;
        let post = insert_post(&pool, d, category, Utc::now() - Duration::hours(1), true).await;
        let comment = insert_comment(&pool, post, d, true).await;
        let service = service(&pool);

        assert!(matches!(
            service.delete(post, comment, &viewer(c)).await,
            Err(CommentServiceError::NotOwner { .. })
        ));
        assert!(matches!(
            service.update(post, comment, &viewer(c), &text("mine now")).await,
            Err(CommentServiceError::NotOwner { .. })
        ));

        let listed = service.list_for_post(post).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].comment.text, "Nice");
    }

    #[tokio::test]
    async fn test_owner_edits_and_deletes() {
        let pool = migrated_pool().await;
        let d = insert_user(&pool, "d").await;
        let category = insert_category(&pool, "travel", true).await;
        let post = insert_post(&pool, d, category, Utc::now() - Duration::hours(1), true).await;
        let other_post = insert_post(&pool, d, category, Utc::now() - Duration::hours(1), true).await;
        let comment = insert_comment(&pool, post, d, true).await;
        let service = service(&pool);

        assert!(matches!(
            service.owned(other_post, comment, &viewer(d)).await,
            Err(CommentServiceError::NotFound)
        ));
        assert!(matches!(
            service.update(post, comment, &viewer(d), &text("")).await,
            Err(CommentServiceError::ValidationError(_))
        ));

        let updated = service
            .update(post, comment, &viewer(d), &text("Edited"))
            .await
            .unwrap();
        assert_eq!(updated.text, "Edited");

        service.delete(post, comment, &viewer(d)).await.unwrap();
        assert!(service.list_for_post(post).await.unwrap().is_empty());
    }
}
