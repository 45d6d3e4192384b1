//! The identity a request is made under

use super::User;

/// The user behind a request, or nobody.
///
/// Resolved once per request from the session cookie and passed explicitly
/// to every service call that depends on who is asking.
#[derive(Debug, Clone, Default)]
pub struct Viewer(Option<User>);

impl Viewer {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn authenticated(user: User) -> Self {
        Self(Some(user))
    }

    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(|u| u.is_staff)
    }

    /// Whether this viewer is the user with `user_id`
    pub fn is(&self, user_id: i64) -> bool {
        self.id() == Some(user_id)
    }
}
