//! Theme engine
//!
//! Templates are compiled into the binary from `templates/`. A theme
//! directory on disk (`<theme.path>/<theme.active>/`) may override any of
//! them by relative name, or add new ones. The engine is built once at
//! startup and shared read-only.

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;

pub use error::ThemeError;

/// Error page tried when a template fails to render
pub const ERROR_TEMPLATE: &str = "errors/500.html";

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

pub struct ThemeEngine {
    tera: Tera,
    theme_name: String,
    /// Template names supplied by the on-disk theme
    overridden: Vec<String>,
}

impl ThemeEngine {
    /// Build the engine from the embedded templates plus any overrides
    /// found under `themes_path/theme_name`. A missing theme directory is
    /// not an error.
    pub fn new(themes_path: &Path, theme_name: &str) -> Result<Self> {
        let mut templates = embedded_templates()?;

        let theme_path = themes_path.join(theme_name);
        let mut overridden = Vec::new();
        if theme_path.is_dir() {
            let mut from_disk = BTreeMap::new();
            collect_templates_from_dir(&theme_path, &theme_path, &mut from_disk)?;
            overridden = from_disk.keys().cloned().collect();
            templates.extend(from_disk);
            tracing::info!(
                theme = theme_name,
                overrides = overridden.len(),
                "Loaded theme templates from {:?}",
                theme_path
            );
        } else {
            tracing::debug!(theme = theme_name, "No theme directory, using embedded templates");
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;

        Ok(Self {
            tera,
            theme_name: theme_name.to_string(),
            overridden,
        })
    }

    /// Engine with the embedded templates only
    pub fn embedded() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(embedded_templates()?)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;
        Ok(Self {
            tera,
            theme_name: "default".to_string(),
            overridden: Vec::new(),
        })
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Template names supplied by the on-disk theme
    pub fn overrides(&self) -> &[String] {
        &self.overridden
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e)))
                .into()
        })
    }

    /// Render with the variables every page expects added to `context`
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);
        full_context.insert("theme_name", &self.theme_name);
        if let Some(ref user) = standard_vars.current_user {
            full_context.insert("current_user", user);
        }

        self.render(template, &full_context)
    }

    /// Render a page with the standard variables; on failure try the
    /// error template, and as a last resort return a built-in page for
    /// `status`. Never fails.
    pub fn render_with_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
        status: u16,
    ) -> String {
        let err = match self.render_with_standard_vars(template, context, standard_vars) {
            Ok(html) => return html,
            Err(e) => e,
        };
        tracing::error!("Failed to render template '{}': {}", template, err);

        if template != ERROR_TEMPLATE {
            match self.render_with_standard_vars(ERROR_TEMPLATE, &TeraContext::new(), standard_vars) {
                Ok(html) => return html,
                Err(e) => tracing::warn!("Failed to render error template: {}", e),
            }
        }
        simple_error_page(status, status_title(status))
    }
}

fn status_title(status: u16) -> &'static str {
    match status {
        404 => "Page not found",
        _ => "Server error",
    }
}

fn embedded_templates() -> Result<BTreeMap<String, String>> {
    let mut templates = BTreeMap::new();
    for name in EmbeddedTemplates::iter() {
        let file = EmbeddedTemplates::get(&name)
            .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
        let content = String::from_utf8(file.data.into_owned())
            .with_context(|| format!("Template {} is not valid UTF-8", name))?;
        templates.insert(name.to_string(), content);
    }
    Ok(templates)
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.insert(template_name, content);
        }
    }
    Ok(())
}

/// Tera nests the useful message in the error's sources
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Minimal page used when no template can be rendered
pub fn simple_error_page(status: u16, title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{status} {title}</title>
</head>
<body>
    <h1>{status}</h1>
    <p>{title}</p>
    <p><a href="/">Home</a></p>
</body>
</html>"#,
        status = status,
        title = tera::escape_html(title)
    )
}

/// Variables injected into every page
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub current_user: Option<CurrentUser>,
    pub request_path: String,
    /// For the footer
    pub year: i32,
}

/// The logged-in user as templates see it
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            current_user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    pub fn with_user(mut self, user: Option<&User>) -> Self {
        self.current_user = user.map(CurrentUser::from);
        self
    }
}

#[cfg(test)]
mod tests;
