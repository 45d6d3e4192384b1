//! Data models
//!
//! Database entities (User, Session, Category, Location, Post, Comment),
//! the input types that create or change them, and request-scoped values
//! such as [`Viewer`] and pagination.

mod category;
mod comment;
mod location;
pub mod pagination;
mod post;
mod session;
mod user;
mod viewer;

pub use category::{CatalogFilter, Category, CreateCategoryInput, UpdateCategoryInput};
pub use comment::{Comment, CommentWithMeta};
pub use location::{CreateLocationInput, Location, UpdateLocationInput};
pub use pagination::{paginate, Page, PageWindow, Paginator};
pub use post::{Post, PostInput, PostQuery, PostScope, PostWithMeta, Visibility};
pub use session::Session;
pub use user::{UpdateProfileInput, User};
pub use viewer::Viewer;
