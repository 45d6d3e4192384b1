//! Theme engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    /// An embedded template listed by name could not be read
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Parsing or rendering failed
    #[error("Template error: {0}")]
    TemplateError(String),
}
