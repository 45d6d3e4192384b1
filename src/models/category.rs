//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A thematic grouping of posts, addressed by its slug.
///
/// Hiding a category hides every post in it from public listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

/// Input for updating a category; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
}

pub(crate) fn default_true() -> bool {
    true
}

/// Listing filter for the staff reference-data endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    pub is_published: Option<bool>,
    /// Case-insensitive substring of the title (categories) or name (locations)
    pub search: Option<String>,
}

impl CatalogFilter {
    /// SQL `WHERE` clause over `column` for the text search.
    ///
    /// Placeholders, in order: `is_published` (if set), then the search
    /// pattern (if set).
    pub fn where_clause(&self, column: &str) -> String {
        let mut conditions = Vec::new();
        if self.is_published.is_some() {
            conditions.push("is_published = ?".to_string());
        }
        if self.search_pattern().is_some() {
            conditions.push(format!("LOWER({}) LIKE ?", column));
        }
        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    /// `%term%`, lowercased; `None` for a blank search
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()))
    }
}
