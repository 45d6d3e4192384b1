//! Post create / edit / delete pages
//!
//! All three require a login; edit and delete additionally require the
//! viewer to be the author, otherwise they redirect to the post page.
//! Create and edit accept either an urlencoded form or multipart with an
//! optional `image` file.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use std::collections::HashMap;

use crate::forms::{FormErrors, PostForm};
use crate::models::{Post, PostInput};
use crate::services::PostServiceError;

use super::error::{post_url, profile_url, AppError};
use super::middleware::{AppState, LoggedIn};
use super::render::{PageContext, Templates};

/// An uploaded image, not yet stored
pub struct Upload {
    pub content_type: String,
    pub data: Bytes,
}

/// A submitted post form with its optional image
pub struct PostSubmission {
    pub form: PostForm,
    pub image: Option<Upload>,
}

impl FromRequest<AppState> for PostSubmission {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(form) = Form::<PostForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(Self { form, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut fields: HashMap<String, String> = HashMap::new();
        let mut image = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let has_file = field.file_name().is_some_and(|n| !n.is_empty());
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if has_file && !data.is_empty() {
                    image = Some(Upload { content_type, data });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                fields.insert(name, value);
            }
        }

        let mut take = |key: &str| fields.remove(key).unwrap_or_default();
        let form = PostForm {
            title: take("title"),
            text: take("text"),
            pub_date: take("pub_date"),
            category: take("category"),
            location: take("location"),
            is_published: fields.remove("is_published"),
        };
        Ok(Self { form, image })
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Create,
    Edit,
    Delete,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Create => "create",
            Mode::Edit => "edit",
            Mode::Delete => "delete",
        }
    }
}

async fn render_form(
    state: &AppState,
    templates: &Templates,
    mode: Mode,
    form: &PostForm,
    errors: &FormErrors,
    post: Option<&Post>,
) -> Result<Response, AppError> {
    let choices = state.post_service.form_choices().await?;
    let mut context = PageContext::new()
        .errors(errors)
        .with("form", form)
        .with("choices", &choices)
        .with("mode", mode.as_str());
    if let Some(post) = post {
        context = context.with("post", post);
    }
    Ok(templates
        .render("blog/create.html", context.context())?
        .into_response())
}

/// Field validation plus the image checks; `Ok(Err(..))` means the form
/// goes back to the user
async fn validate_submission(
    state: &AppState,
    submission: &PostSubmission,
) -> Result<Result<PostInput, FormErrors>, AppError> {
    let mut errors = FormErrors::new();
    let input = match state.post_service.validate(&submission.form).await {
        Ok(input) => Some(input),
        Err(PostServiceError::ValidationError(e)) => {
            errors.merge(e);
            None
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(upload) = &submission.image {
        if let Err(e) = state
            .media
            .check(&upload.content_type, upload.data.len() as u64)
        {
            errors.add("image", e.to_string());
        }
    }

    Ok(match input {
        Some(input) if errors.is_empty() => Ok(input),
        _ => Err(errors),
    })
}

/// Sets `input.image` only for a new upload; the caller removes the file
/// again if the post write fails
async fn store_image(
    state: &AppState,
    submission: &PostSubmission,
    input: &mut PostInput,
) -> Result<(), AppError> {
    if let Some(upload) = &submission.image {
        let path = state
            .media
            .save(&upload.content_type, &upload.data)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        input.image = Some(path);
    }
    Ok(())
}

async fn discard_image(state: &AppState, image: Option<&str>) {
    if let Some(path) = image {
        if let Err(e) = state.media.remove(path).await {
            tracing::warn!("Failed to remove image {}: {}", path, e);
        }
    }
}

/// GET /posts/create/
pub async fn create_form(
    State(state): State<AppState>,
    templates: Templates,
    _user: LoggedIn,
) -> Result<Response, AppError> {
    render_form(
        &state,
        &templates,
        Mode::Create,
        &PostForm::blank(),
        &FormErrors::new(),
        None,
    )
    .await
}

/// POST /posts/create/
pub async fn create(
    State(state): State<AppState>,
    templates: Templates,
    LoggedIn(user): LoggedIn,
    submission: PostSubmission,
) -> Result<Response, AppError> {
    let mut input = match validate_submission(&state, &submission).await? {
        Ok(input) => input,
        Err(errors) => {
            return render_form(&state, &templates, Mode::Create, &submission.form, &errors, None)
                .await;
        }
    };

    store_image(&state, &submission, &mut input).await?;
    if let Err(e) = state.post_service.create(user.id, &input).await {
        discard_image(&state, input.image.as_deref()).await;
        return Err(e.into());
    }

    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}

/// GET /posts/{id}/edit/
pub async fn edit_form(
    State(state): State<AppState>,
    templates: Templates,
    user: LoggedIn,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    let post = state.post_service.owned(post_id, &user.viewer()).await?;
    render_form(
        &state,
        &templates,
        Mode::Edit,
        &PostForm::from_post(&post),
        &FormErrors::new(),
        Some(&post),
    )
    .await
}

/// POST /posts/{id}/edit/
pub async fn edit(
    State(state): State<AppState>,
    templates: Templates,
    user: LoggedIn,
    Path(post_id): Path<i64>,
    submission: PostSubmission,
) -> Result<Response, AppError> {
    let viewer = user.viewer();
    let post = state.post_service.owned(post_id, &viewer).await?;

    let mut input = match validate_submission(&state, &submission).await? {
        Ok(input) => input,
        Err(errors) => {
            return render_form(
                &state,
                &templates,
                Mode::Edit,
                &submission.form,
                &errors,
                Some(&post),
            )
            .await;
        }
    };

    store_image(&state, &submission, &mut input).await?;
    if let Err(e) = state.post_service.update(post_id, &viewer, &input).await {
        discard_image(&state, input.image.as_deref()).await;
        return Err(e.into());
    }
    if input.image.is_some() {
        discard_image(&state, post.image.as_deref()).await;
    }

    Ok(Redirect::to(&post_url(post_id)).into_response())
}

/// GET /posts/{id}/delete/
pub async fn delete_form(
    State(state): State<AppState>,
    templates: Templates,
    user: LoggedIn,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    let post = state.post_service.owned(post_id, &user.viewer()).await?;
    render_form(
        &state,
        &templates,
        Mode::Delete,
        &PostForm::from_post(&post),
        &FormErrors::new(),
        Some(&post),
    )
    .await
}

/// POST /posts/{id}/delete/
pub async fn delete(
    State(state): State<AppState>,
    user: LoggedIn,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    let post = state.post_service.delete(post_id, &user.viewer()).await?;
    discard_image(&state, post.image.as_deref()).await;

    Ok(Redirect::to(&profile_url(&user.0.username)).into_response())
}
