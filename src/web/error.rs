//! HTML error responses
//!
//! Handlers return [`AppError`]. Its response carries an [`ErrorPage`]
//! marker instead of a body; [`render_error_pages`] replaces the body with
//! the themed 404/500 page once the response comes back out of the router.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use tera::Context as TeraContext;

use crate::models::Viewer;
use crate::services::{CommentServiceError, PostServiceError, UserServiceError};
use crate::theme::{StandardTemplateVars, ERROR_TEMPLATE};

use super::middleware::AppState;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// Soft denial: send the user elsewhere without acting
    #[error("Redirect to {0}")]
    Redirect(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marks a response whose body should be the themed error page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage(pub StatusCode);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Redirect(to) => return Redirect::to(&to).into_response(),
            AppError::BadRequest(message) => {
                return (StatusCode::BAD_REQUEST, message).into_response();
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut response = status.into_response();
        response.extensions_mut().insert(ErrorPage(status));
        response
    }
}

impl From<PostServiceError> for AppError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound => AppError::NotFound,
            PostServiceError::NotOwner { post_id } => AppError::Redirect(post_url(post_id)),
            PostServiceError::ValidationError(errors) => AppError::BadRequest(errors.to_string()),
            PostServiceError::InternalError(e) => AppError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for AppError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound => AppError::NotFound,
            CommentServiceError::LoginRequired => AppError::Redirect(super::middleware::LOGIN_URL.to_string()),
            CommentServiceError::NotOwner { post_id, .. } => AppError::Redirect(post_url(post_id)),
            CommentServiceError::ValidationError(errors) => AppError::BadRequest(errors.to_string()),
            CommentServiceError::InternalError(e) => AppError::Internal(e),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound => AppError::NotFound,
            UserServiceError::AuthenticationError(message) => AppError::BadRequest(message),
            UserServiceError::ValidationError(errors) => AppError::BadRequest(errors.to_string()),
            UserServiceError::InternalError(e) => AppError::Internal(e),
        }
    }
}

pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

/// Fill marked error responses with the themed page
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let viewer = request.extensions().get::<Viewer>().cloned().unwrap_or_default();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let Some(ErrorPage(status)) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let template = if status == StatusCode::NOT_FOUND {
        "errors/404.html"
    } else {
        ERROR_TEMPLATE
    };
    let vars = StandardTemplateVars::new(state.site_name.as_ref(), path).with_user(viewer.user());

    let html = state.theme_engine.render_with_fallback(
        template,
        &TeraContext::new(),
        &vars,
        status.as_u16(),
    );

    (status, Html(html)).into_response()
}

/// Router fallback for unknown paths
pub async fn not_found() -> AppError {
    AppError::NotFound
}
