//! Profile pages

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::forms::{FormErrors, ProfileForm};
use crate::models::Viewer;
use crate::services::UserServiceError;

use super::common::PageQuery;
use super::error::{profile_url, AppError};
use super::middleware::{AppState, LoggedIn};
use super::render::{PageContext, Templates};

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    templates: Templates,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let profile = state.user_service.get_by_username(&username).await?;
    let page = state
        .post_service
        .author_feed(&profile, &viewer, query.page())
        .await?;

    let context = PageContext::new()
        .with("profile", &profile)
        .with("display_name", &profile.display_name())
        .with("is_owner", &viewer.is(profile.id))
        .with("page", &page);
    Ok(templates
        .render("users/profile.html", context.context())?
        .into_response())
}

/// GET /profile/edit/
pub async fn edit_form(templates: Templates, LoggedIn(user): LoggedIn) -> Result<Response, AppError> {
    render_edit(&templates, &ProfileForm::from_user(&user), &FormErrors::new())
}

/// POST /profile/edit/
pub async fn edit(
    State(state): State<AppState>,
    templates: Templates,
    LoggedIn(user): LoggedIn,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    match state.user_service.update_profile(user.id, &form).await {
        Ok(updated) => Ok(Redirect::to(&profile_url(&updated.username)).into_response()),
        Err(UserServiceError::ValidationError(errors)) => render_edit(&templates, &form, &errors),
        Err(e) => Err(e.into()),
    }
}

fn render_edit(
    templates: &Templates,
    form: &ProfileForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let context = PageContext::new().errors(errors).with("form", form);
    Ok(templates
        .render("users/profile_edit.html", context.context())?
        .into_response())
}
