//! Services layer - business logic
//!
//! Services sit between the web handlers and the repositories: they apply
//! visibility and ownership rules, validate forms and log notable events.
//! Each has its own error enum; storage failures arrive as `anyhow` errors
//! wrapped in `InternalError`.

pub mod catalog;
pub mod comment;
pub mod media;
pub mod password;
pub mod post;
pub mod user;
pub mod visibility;

pub use catalog::{CatalogService, CatalogServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use media::{MediaError, MediaStore};
pub use password::{hash_password, verify_password};
pub use post::{FormChoices, PostService, PostServiceError};
pub use user::{UserService, UserServiceError};
pub use visibility::{can_view, filter_published, is_publicly_visible, Publishable};
