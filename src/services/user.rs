//! User service
//!
//! Registration, login/logout, session validation and profile edits.
//! The first account ever registered becomes staff.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::forms::{FormErrors, ProfileForm, RegistrationForm};
use crate::models::{Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Default session lifetime in days
pub const DEFAULT_SESSION_DAYS: i64 = 7;

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown username or wrong password
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Form input rejected; carries per-field messages
    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    #[error("User not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_days(user_repo, session_repo, DEFAULT_SESSION_DAYS)
    }

    pub fn with_session_days(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_days: session_days.max(1),
        }
    }

    /// How long a fresh session stays valid; also the cookie `Max-Age`
    pub fn session_lifetime(&self) -> Duration {
        Duration::days(self.session_days)
    }

    /// Register a new account from a submitted registration form.
    ///
    /// A taken username is reported as a field error on `username`.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, UserServiceError> {
        let input = form.clean().map_err(UserServiceError::ValidationError)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            let mut errors = FormErrors::new();
            errors.add("username", "A user with that username already exists.");
            return Err(UserServiceError::ValidationError(errors));
        }

        let is_staff = self.is_first_user().await?;
        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.username, input.email, password_hash, is_staff);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, is_staff, "User registered");
        Ok(created)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to get user by username")?;

        let Some(user) = user else {
            tracing::debug!(username, "Login failed: unknown user");
            return Err(UserServiceError::AuthenticationError(BAD_CREDENTIALS.to_string()));
        };

        let password_valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Login failed: wrong password");
            return Err(UserServiceError::AuthenticationError(BAD_CREDENTIALS.to_string()));
        }

        let session = self
            .session_repo
            .create(&Session::new(user.id, self.session_lifetime()))
            .await
            .context("Failed to create session")?;

        tracing::debug!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// Invalidate a session token
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// The user behind a session token, if the session exists and is live.
    /// An expired session is removed on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;

        Ok(count == 0)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or(UserServiceError::NotFound)
    }

    /// Apply a profile form to the user's own account
    pub async fn update_profile(
        &self,
        user_id: i64,
        form: &ProfileForm,
    ) -> Result<User, UserServiceError> {
        let input = form.clean().map_err(UserServiceError::ValidationError)?;

        self.user_repo
            .update_profile(user_id, &input)
            .await
            .context("Failed to update profile")?
            .ok_or(UserServiceError::NotFound)
    }

    /// Delete all expired sessions; returns how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}
