//! Registration, login and logout

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::forms::{FormErrors, LoginForm, RegistrationForm};
use crate::services::UserServiceError;

use super::common::{clear_session_cookie, redirect_with_cookie, safe_next, session_cookie, NextQuery};
use super::error::AppError;
use super::middleware::{extract_session_token, AppState, LOGIN_URL};
use super::render::{PageContext, Templates};

fn render_registration(
    templates: &Templates,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let context = PageContext::new().errors(errors).with("form", form);
    Ok(templates
        .render("registration/registration_form.html", context.context())?
        .into_response())
}

fn render_login(templates: &Templates, form: &LoginForm, errors: &FormErrors) -> Result<Response, AppError> {
    let context = PageContext::new().errors(errors).with("form", form);
    Ok(templates
        .render("registration/login.html", context.context())?
        .into_response())
}

/// GET /auth/registration/
pub async fn registration_form(templates: Templates) -> Result<Response, AppError> {
    render_registration(&templates, &RegistrationForm::default(), &FormErrors::new())
}

/// POST /auth/registration/
pub async fn register(
    State(state): State<AppState>,
    templates: Templates,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    match state.user_service.register(&form).await {
        Ok(_) => Ok(Redirect::to(LOGIN_URL).into_response()),
        Err(UserServiceError::ValidationError(errors)) => {
            render_registration(&templates, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/login/
pub async fn login_form(
    templates: Templates,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    let form = LoginForm {
        next: query.next.unwrap_or_default(),
        ..Default::default()
    };
    render_login(&templates, &form, &FormErrors::new())
}

/// POST /auth/login/
pub async fn login(
    State(state): State<AppState>,
    templates: Templates,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.user_service.login(&form.username, &form.password).await {
        Ok(session) => {
            let target = safe_next(&form.next).unwrap_or("/");
            let cookie = session_cookie(&session.id, state.user_service.session_lifetime());
            Ok(redirect_with_cookie(target, &cookie))
        }
        Err(UserServiceError::AuthenticationError(message)) => {
            let mut errors = FormErrors::new();
            errors.add(FormErrors::NON_FIELD, message);
            render_login(&templates, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    Ok(redirect_with_cookie("/", clear_session_cookie()))
}
