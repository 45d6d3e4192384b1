//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog post as stored.
///
/// A post is publicly visible only while it is published, its category is
/// published, and its `pub_date` is not in the future. Its author always
/// sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    /// Path relative to the media root
    pub image: Option<String>,
    pub author_id: i64,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A post joined with what listings and the detail page display
#[derive(Debug, Clone, Serialize)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub category_title: String,
    pub category_slug: String,
    pub category_is_published: bool,
    /// Set only while the location itself is published
    pub location_name: Option<String>,
    /// Number of published comments
    pub comment_count: i64,
}

/// Validated post fields, used for both create and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: i64,
    pub location_id: Option<i64>,
    /// New image; `None` keeps the current one on update
    pub image: Option<String>,
}

/// Which posts a listing draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Category(i64),
    Author(i64),
}

/// Whether a listing is restricted to publicly visible posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only posts visible to the public at `now`
    Public { now: DateTime<Utc> },
    /// Every post in scope (the author's own view)
    Everything,
}

/// Description of a post listing, rendered to SQL by the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    pub scope: PostScope,
    pub visibility: Visibility,
}

impl PostQuery {
    pub fn public(scope: PostScope, now: DateTime<Utc>) -> Self {
        Self {
            scope,
            visibility: Visibility::Public { now },
        }
    }

    pub fn unfiltered(scope: PostScope) -> Self {
        Self {
            scope,
            visibility: Visibility::Everything,
        }
    }

    /// SQL `WHERE` clause over `posts p` joined with `categories c`.
    ///
    /// Placeholders, in order: the scope id (if any), then `now` (if public).
    pub fn where_clause(&self) -> String {
        let mut conditions: Vec<&str> = Vec::new();
        match self.scope {
            PostScope::All => {}
            PostScope::Category(_) => conditions.push("p.category_id = ?"),
            PostScope::Author(_) => conditions.push("p.author_id = ?"),
        }
        if let Visibility::Public { .. } = self.visibility {
            conditions.push("p.is_published = 1");
            conditions.push("c.is_published = 1");
            conditions.push("p.pub_date <= ?");
        }
        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    pub fn scope_id(&self) -> Option<i64> {
        match self.scope {
            PostScope::All => None,
            PostScope::Category(id) | PostScope::Author(id) => Some(id),
        }
    }

    pub fn now(&self) -> Option<DateTime<Utc>> {
        match self.visibility {
            Visibility::Public { now } => Some(now),
            Visibility::Everything => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_public_feed() {
        let query = PostQuery::public(PostScope::All, Utc::now());
        assert_eq!(
            query.where_clause(),
            "WHERE p.is_published = 1 AND c.is_published = 1 AND p.pub_date <= ?"
        );
        assert_eq!(query.scope_id(), None);
        assert!(query.now().is_some());
    }

    #[test]
    fn test_where_clause_author_own_view() {
        let query = PostQuery::unfiltered(PostScope::Author(7));
        assert_eq!(query.where_clause(), "WHERE p.author_id = ?");
        assert_eq!(query.scope_id(), Some(7));
        assert!(query.now().is_none());
    }

    #[test]
    fn test_where_clause_unfiltered_all_is_empty() {
        assert_eq!(PostQuery::unfiltered(PostScope::All).where_clause(), "");
    }

    #[test]
    fn test_where_clause_category_public() {
        let query = PostQuery::public(PostScope::Category(3), Utc::now());
        assert!(query.where_clause().starts_with("WHERE p.category_id = ? AND"));
    }
}
