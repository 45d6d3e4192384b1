//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment left by a registered user on a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    /// Hidden comments are neither listed nor counted
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Comment with its author's name, for display
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithMeta {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_username: String,
}
