//! Comment add / edit / delete
//!
//! Every outcome that is not a form re-render lands back on the post page,
//! including a refused edit or delete of someone else's comment.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::forms::{CommentForm, FormErrors};
use crate::models::Comment;
use crate::services::CommentServiceError;

use super::error::{post_url, AppError};
use super::middleware::{AppState, LoggedIn};
use super::render::{PageContext, Templates};

fn render_comment_page(
    templates: &Templates,
    post_id: i64,
    comment: &Comment,
    form: Option<&CommentForm>,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let mut context = PageContext::new()
        .errors(errors)
        .with("post_id", &post_id)
        .with("comment", comment);
    if let Some(form) = form {
        context = context.with("form", form);
    }
    Ok(templates
        .render("blog/comment.html", context.context())?
        .into_response())
}

/// POST /posts/{id}/comment/
pub async fn add(
    State(state): State<AppState>,
    user: LoggedIn,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    state
        .comment_service
        .add(post_id, &user.viewer(), &form)
        .await?;
    Ok(Redirect::to(&post_url(post_id)).into_response())
}

/// GET /posts/{id}/edit_comment/{comment_id}/
pub async fn edit_form(
    State(state): State<AppState>,
    templates: Templates,
    user: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    let comment = state
        .comment_service
        .owned(post_id, comment_id, &user.viewer())
        .await?;

    let form = CommentForm {
        text: comment.text.clone(),
    };
    render_comment_page(&templates, post_id, &comment, Some(&form), &FormErrors::new())
}

/// POST /posts/{id}/edit_comment/{comment_id}/
pub async fn edit(
    State(state): State<AppState>,
    templates: Templates,
    user: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let viewer = user.viewer();
    match state
        .comment_service
        .update(post_id, comment_id, &viewer, &form)
        .await
    {
        Ok(_) => Ok(Redirect::to(&post_url(post_id)).into_response()),
        Err(CommentServiceError::ValidationError(errors)) => {
            let comment = state
                .comment_service
                .owned(post_id, comment_id, &viewer)
                .await?;
            render_comment_page(&templates, post_id, &comment, Some(&form), &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/delete_comment/{comment_id}/
pub async fn delete_form(
    State(state): State<AppState>,
    templates: Templates,
    user: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    let comment = state
        .comment_service
        .owned(post_id, comment_id, &user.viewer())
        .await?;

    render_comment_page(&templates, post_id, &comment, None, &FormErrors::new())
}

/// POST /posts/{id}/delete_comment/{comment_id}/
pub async fn delete(
    State(state): State<AppState>,
    user: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    state
        .comment_service
        .delete(post_id, comment_id, &user.viewer())
        .await?;
    Ok(Redirect::to(&post_url(post_id)).into_response())
}
