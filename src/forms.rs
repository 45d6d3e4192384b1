//! HTML form handling
//!
//! Each form holds the raw submitted strings so a failed submission can be
//! rendered back to the user unchanged, and a `clean` method that turns them
//! into typed input or a set of field errors.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Post, UpdateProfileInput, User};

pub const MAX_TITLE_LENGTH: usize = 256;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;

const REQUIRED: &str = "This field is required.";

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap_or_else(|e| panic!("username pattern: {e}")));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email pattern: {e}"))
});

/// Field name to messages. Form-wide messages use [`FormErrors::NON_FIELD`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(value)` when no error was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

fn require(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, REQUIRED);
    }
    trimmed.to_string()
}

fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let length = value.chars().count();
    if length > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, length
            ),
        );
    }
}

/// Parse a `datetime-local` style value as UTC.
///
/// Accepts `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM`, either with `:SS`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp for a `datetime-local` input
pub fn format_pub_date(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M").to_string()
}

// ============================================================================
// Post
// ============================================================================

/// Submitted post fields, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    /// Category id
    #[serde(default)]
    pub category: String,
    /// Location id; blank for none
    #[serde(default)]
    pub location: String,
    /// Checkbox: present means checked
    #[serde(default)]
    pub is_published: Option<String>,
}

/// Post fields that passed field-level validation. Whether the referenced
/// category and location exist is checked against the database later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: i64,
    pub location_id: Option<i64>,
}

impl PostForm {
    /// An empty form: published, dated now
    pub fn blank() -> Self {
        Self {
            pub_date: format_pub_date(&Utc::now()),
            is_published: Some("on".to_string()),
            ..Default::default()
        }
    }

    /// The form pre-filled from a stored post
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: format_pub_date(&post.pub_date),
            category: post.category_id.to_string(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            is_published: post.is_published.then(|| "on".to_string()),
        }
    }

    pub fn published(&self) -> bool {
        self.is_published.is_some()
    }

    pub fn clean(&self) -> Result<CleanPost, FormErrors> {
        let mut errors = FormErrors::new();

        let title = require(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", &title, MAX_TITLE_LENGTH);
        let text = require(&mut errors, "text", &self.text);

        let pub_date = if self.pub_date.trim().is_empty() {
            errors.add("pub_date", REQUIRED);
            None
        } else {
            let parsed = parse_pub_date(&self.pub_date);
            if parsed.is_none() {
                errors.add("pub_date", "Enter a valid date/time.");
            }
            parsed
        };

        let category_id = match self.category.trim() {
            "" => {
                errors.add("category", REQUIRED);
                None
            }
            raw => {
                let parsed = raw.parse::<i64>().ok();
                if parsed.is_none() {
                    errors.add("category", "Select a valid choice.");
                }
                parsed
            }
        };

        let location_id = match self.location.trim() {
            "" => None,
            raw => {
                let parsed = raw.parse::<i64>().ok();
                if parsed.is_none() {
                    errors.add("location", "Select a valid choice.");
                }
                parsed
            }
        };

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => Ok(CleanPost {
                title,
                text,
                pub_date,
                is_published: self.published(),
                category_id,
                location_id,
            }),
            _ => Err(errors),
        }
    }
}

// ============================================================================
// Comment
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = require(&mut errors, "text", &self.text);
        errors.into_result(text)
    }
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn clean(&self) -> Result<UpdateProfileInput, FormErrors> {
        let mut errors = FormErrors::new();
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        let email = self.email.trim().to_string();

        max_length(&mut errors, "first_name", &first_name, MAX_NAME_LENGTH);
        max_length(&mut errors, "last_name", &last_name, MAX_NAME_LENGTH);
        check_email(&mut errors, &email);

        errors.into_result(UpdateProfileInput {
            first_name,
            last_name,
            email,
        })
    }
}

fn check_email(errors: &mut FormErrors, email: &str) {
    if !email.is_empty() && !EMAIL_RE.is_match(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

// ============================================================================
// Registration & login
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

/// A registration that passed field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn clean(&self) -> Result<RegisterInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = require(&mut errors, "username", &self.username);
        if !username.is_empty() {
            max_length(&mut errors, "username", &username, MAX_USERNAME_LENGTH);
            if !USERNAME_RE.is_match(&username) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        let email = self.email.trim().to_string();
        check_email(&mut errors, &email);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else {
            if self.password1.chars().count() < MIN_PASSWORD_LENGTH {
                errors.add(
                    "password1",
                    format!(
                        "This password is too short. It must contain at least {} characters.",
                        MIN_PASSWORD_LENGTH
                    ),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password1", "This password is entirely numeric.");
            }
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result(RegisterInput {
            username,
            email,
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Where to go after logging in
    #[serde(default)]
    pub next: String,
}
