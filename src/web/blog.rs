//! Public pages: home feed, category feed, post detail

use axum::{
    extract::{Path, Query, State},
    response::Html,
};

use crate::forms::CommentForm;
use crate::models::Viewer;

use super::common::PageQuery;
use super::error::AppError;
use super::middleware::AppState;
use super::render::{PageContext, Templates};

/// GET /
pub async fn index(
    State(state): State<AppState>,
    templates: Templates,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = state.post_service.feed(query.page()).await?;
    templates.render("blog/index.html", PageContext::new().with("page", &page).context())
}

/// GET /category/{slug}/
pub async fn category(
    State(state): State<AppState>,
    templates: Templates,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let (category, page) = state
        .post_service
        .category_feed(&slug, query.page())
        .await?;

    let context = PageContext::new()
        .with("category", &category)
        .with("page", &page);
    templates.render("blog/category.html", context.context())
}

/// GET /posts/{id}/
pub async fn detail(
    State(state): State<AppState>,
    templates: Templates,
    viewer: Viewer,
    Path(post_id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let post = state.post_service.detail(post_id, &viewer).await?;
    let comments = state.comment_service.list_for_post(post_id).await?;

    let context = PageContext::new()
        .with("post", &post)
        .with("comments", &comments)
        .with("form", &CommentForm::default())
        .with("is_author", &viewer.is(post.post.author_id));
    templates.render("blog/detail.html", context.context())
}
