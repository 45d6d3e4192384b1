//! Page rendering for handlers

use axum::{extract::FromRequestParts, http::request::Parts, response::Html};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::forms::FormErrors;
use crate::models::Viewer;
use crate::theme::{StandardTemplateVars, ThemeEngine};

use super::error::AppError;
use super::middleware::AppState;

/// The theme plus the per-request variables every page shows
pub struct Templates {
    engine: Arc<ThemeEngine>,
    vars: StandardTemplateVars,
}

impl FromRequestParts<AppState> for Templates {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let viewer = parts.extensions.get::<Viewer>().cloned().unwrap_or_default();
        let vars = StandardTemplateVars::new(state.site_name.as_ref(), parts.uri.path())
            .with_user(viewer.user());
        Ok(Self {
            engine: state.theme_engine.clone(),
            vars,
        })
    }
}

impl Templates {
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<Html<String>, AppError> {
        let html = self
            .engine
            .render_with_standard_vars(template, context, &self.vars)?;
        Ok(Html(html))
    }
}

/// Context builder that always defines `errors`, so templates can test
/// `errors.<field>` without guarding against an undefined map
pub struct PageContext(TeraContext);

impl PageContext {
    pub fn new() -> Self {
        let mut context = TeraContext::new();
        context.insert("errors", &FormErrors::new());
        Self(context)
    }

    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        self.0.insert(key, value);
        self
    }

    pub fn errors(self, errors: &FormErrors) -> Self {
        self.with("errors", errors)
    }

    pub fn context(&self) -> &TeraContext {
        &self.0
    }
}

impl Default for PageContext {
    fn default() -> Self {
        Self::new()
    }
}
