use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process-unique user identifier. Fresh on every login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn generate() -> Self {
        UserId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId(s)
    }
}

/// Either fully anonymous or fully authenticated; the three flags are
/// projections of this single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    pub fn is_anonymous(self) -> bool {
        matches!(self, SessionState::Anonymous)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Username as submitted on the login form.
    pub name: String,
    pub logged_in_at: DateTime<Utc>,
    state: SessionState,
}

impl User {
    /// A freshly logged-in user with a newly generated id.
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self::with_id(UserId::generate(), name)
    }

    pub fn with_id(id: UserId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), logged_in_at: Utc::now(), state: SessionState::Authenticated }
    }

    pub fn state(&self) -> SessionState { self.state }
    pub fn is_authenticated(&self) -> bool { self.state.is_authenticated() }
    pub fn is_active(&self) -> bool { self.state.is_active() }
    pub fn is_anonymous(&self) -> bool { self.state.is_anonymous() }
}

/// The principal resolved for the request being served.
#[derive(Debug, Clone, Default)]
pub enum CurrentUser {
    #[default]
    Anonymous,
    User(Arc<User>),
}

impl CurrentUser {
    pub fn state(&self) -> SessionState {
        match self {
            CurrentUser::Anonymous => SessionState::Anonymous,
            CurrentUser::User(u) => u.state(),
        }
    }

    pub fn is_authenticated(&self) -> bool { self.state().is_authenticated() }
    pub fn is_active(&self) -> bool { self.state().is_active() }
    pub fn is_anonymous(&self) -> bool { self.state().is_anonymous() }

    pub fn user(&self) -> Option<&Arc<User>> {
        match self {
            CurrentUser::Anonymous => None,
            CurrentUser::User(u) => Some(u),
        }
    }

    pub fn id(&self) -> Option<&UserId> {
        self.user().map(|u| &u.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_user_has_consistent_flags() {
        let u = User::authenticated("alice");
        assert_eq!(u.name, "alice");
        assert!(u.is_authenticated());
        assert!(u.is_active());
        assert!(!u.is_anonymous());
    }

    #[test]
    fn ids_are_fresh_per_login() {
        let a = User::authenticated("bob");
        let b = User::authenticated("bob");
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(a.id.as_str()).is_ok());
    }

    #[test]
    fn anonymous_current_user() {
        let cu = CurrentUser::default();
        assert!(cu.is_anonymous());
        assert!(!cu.is_authenticated());
        assert!(!cu.is_active());
        assert!(cu.id().is_none());
    }

    #[test]
    fn current_user_exposes_record() {
        let u = Arc::new(User::with_id(UserId::from("42"), "carol"));
        let cu = CurrentUser::User(u.clone());
        assert!(cu.is_authenticated());
        assert_eq!(cu.id().map(|i| i.to_string()).as_deref(), Some("42"));
        assert!(Arc::ptr_eq(cu.user().unwrap(), &u));
    }
}
