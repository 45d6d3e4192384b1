//! Web layer - HTML pages, the staff JSON API, and media files
//!
//! Page handlers live in one module per area (blog, posts, comments, users,
//! auth); the staff API is in `admin`.

pub mod admin;
pub mod auth;
pub mod blog;
pub mod comments;
pub mod common;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod render;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use error::AppError;
pub use middleware::{ApiError, AppState, LoggedIn};

/// Room for the text fields of a multipart post form on top of the image
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index))
        .route("/category/{slug}/", get(blog::category))
        .route("/posts/create/", get(posts::create_form).post(posts::create))
        .route("/posts/{id}/", get(blog::detail))
        .route("/posts/{id}/edit/", get(posts::edit_form).post(posts::edit))
        .route("/posts/{id}/delete/", get(posts::delete_form).post(posts::delete))
        .route("/posts/{id}/comment/", post(comments::add))
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            get(comments::edit_form).post(comments::edit),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            get(comments::delete_form).post(comments::delete),
        )
        .route("/profile/edit/", get(users::edit_form).post(users::edit))
        .route("/profile/{username}/", get(users::profile))
        .route(
            "/auth/registration/",
            get(auth::registration_form).post(auth::register),
        )
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", post(auth::logout))
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .nest("/admin/api", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_staff));

    let body_limit = state.media.max_file_size() as usize + FORM_OVERHEAD_BYTES;

    Router::new()
        .merge(page_routes())
        .merge(admin_routes)
        .nest_service("/media", ServeDir::new(state.media.root()))
        .fallback(error::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            error::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_viewer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
