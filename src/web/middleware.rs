//! Shared state, session resolution and access control
//!
//! Every request passes through [`resolve_viewer`], which turns the
//! `session` cookie into a [`Viewer`] request extension. Handlers then ask
//! for a `Viewer` (anyone) or a [`LoggedIn`] user (redirects anonymous
//! visitors to the login page). The staff JSON API is gated by
//! [`require_staff`].

use anyhow::Result;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Paginator, User, Viewer};
use crate::services::{CatalogService, CommentService, MediaStore, PostService, UserService};
use crate::theme::ThemeEngine;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Where anonymous visitors are sent
pub const LOGIN_URL: &str = "/auth/login/";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub catalog_service: Arc<CatalogService>,
    pub media: Arc<MediaStore>,
    pub theme_engine: Arc<ThemeEngine>,
    pub site_name: Arc<str>,
}

impl AppState {
    /// Wire repositories and services over `pool` as configured
    pub fn build(pool: DynDatabasePool, config: &Config) -> Result<Self> {
        let theme_engine = ThemeEngine::new(&config.theme.path, &config.theme.active)?;
        Ok(Self::with_theme(pool, config, theme_engine))
    }

    pub fn with_theme(pool: DynDatabasePool, config: &Config, theme_engine: ThemeEngine) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let locations = SqlxLocationRepository::boxed(pool.clone());
        let comments = SqlxCommentRepository::boxed(pool.clone());

        Self {
            user_service: Arc::new(UserService::with_session_days(
                users,
                sessions,
                config.blog.session_days,
            )),
            post_service: Arc::new(PostService::new(
                posts.clone(),
                categories.clone(),
                locations.clone(),
                Paginator::new(config.blog.posts_per_page),
            )),
            comment_service: Arc::new(CommentService::new(comments, posts)),
            catalog_service: Arc::new(CatalogService::new(categories, locations)),
            media: Arc::new(MediaStore::new(config.media.clone())),
            theme_engine: Arc::new(theme_engine),
            site_name: Arc::from(config.blog.site_name.as_str()),
            pool,
        }
    }
}

/// Error body for the JSON API: `{"error":{"code","message"}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// The `session` cookie value, if any
pub fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().strip_prefix("session="))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolve the session cookie into a [`Viewer`] extension.
///
/// A lookup failure is logged and the request continues anonymously.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut viewer = Viewer::anonymous();
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => viewer = Viewer::authenticated(user),
            Ok(None) => {}
            Err(e) => tracing::error!("Session validation failed: {}", e),
        }
    }
    request.extensions_mut().insert(viewer);
    next.run(request).await
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// Login URL that brings the user back to `path` afterwards
pub fn login_redirect(path_and_query: &str) -> Redirect {
    Redirect::to(&format!(
        "{}?next={}",
        LOGIN_URL,
        urlencoding::encode(path_and_query)
    ))
}

/// An authenticated user; anonymous requests are redirected to the login
/// page with `next` set to the requested path
#[derive(Debug, Clone)]
pub struct LoggedIn(pub User);

impl LoggedIn {
    pub fn viewer(&self) -> Viewer {
        Viewer::authenticated(self.0.clone())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for LoggedIn {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>().and_then(Viewer::user) {
            Some(user) => Ok(LoggedIn(user.clone())),
            None => {
                let target = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(login_redirect(target))
            }
        }
    }
}

/// Staff-only gate for the JSON API: 401 anonymous, 403 non-staff
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let viewer = request
        .extensions()
        .get::<Viewer>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !viewer.is_authenticated() {
        return Err(ApiError::unauthorized("Authentication required"));
    }
    if !viewer.is_staff() {
        tracing::debug!(user_id = ?viewer.id(), "Staff API access denied");
        return Err(ApiError::forbidden("Staff privileges required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        assert_eq!(
            extract_session_token(&headers("theme=dark; session=abc123; lang=en")),
            Some("abc123".to_string())
        );
        assert_eq!(extract_session_token(&headers("session=")), None);
        assert_eq!(extract_session_token(&headers("sessionid=zzz")), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_login_redirect_encodes_next() {
        let response = login_redirect("/posts/5/comment/?x=1").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login/?next=%2Fposts%2F5%2Fcomment%2F%3Fx%3D1"
        );
    }

    #[test]
    fn test_api_error_status() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::new("ODD", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
