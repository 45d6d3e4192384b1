//! Who may see a post
//!
//! A post is public while it is published, its category is published and
//! its publication date has arrived. Its author sees it regardless.
//! `PostQuery::where_clause` is the SQL rendering of the same rule.

use chrono::{DateTime, Utc};

use crate::models::{PostWithMeta, Viewer};

/// What the visibility rule needs to know about a post
pub trait Publishable {
    fn is_published(&self) -> bool;
    fn category_is_published(&self) -> bool;
    fn pub_date(&self) -> DateTime<Utc>;
    fn author_id(&self) -> i64;
}

impl Publishable for PostWithMeta {
    fn is_published(&self) -> bool {
        self.post.is_published
    }

    fn category_is_published(&self) -> bool {
        self.category_is_published
    }

    fn pub_date(&self) -> DateTime<Utc> {
        self.post.pub_date
    }

    fn author_id(&self) -> i64 {
        self.post.author_id
    }
}

pub fn is_publicly_visible<P: Publishable>(post: &P, now: DateTime<Utc>) -> bool {
    post.is_published() && post.category_is_published() && post.pub_date() <= now
}

/// The author always passes; everyone else needs the post to be public
pub fn can_view<P: Publishable>(viewer: &Viewer, post: &P, now: DateTime<Utc>) -> bool {
    viewer.is(post.author_id()) || is_publicly_visible(post, now)
}

/// Keep only publicly visible posts, preserving order
pub fn filter_published<P: Publishable>(posts: Vec<P>, now: DateTime<Utc>) -> Vec<P> {
    posts
        .into_iter()
        .filter(|post| is_publicly_visible(post, now))
        .collect()
}
