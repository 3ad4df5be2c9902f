//! Login and registration forms and their validation rules.
//!
//! Forms arrive urlencoded. Validation only checks shape; there is no account
//! database, so any non-blank username and password pair logs in.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Invalid email address.";
pub const PASSWORDS_DIFFER: &str = "Field must be equal to password.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("static email pattern")
});

/// Field name to validation messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    fn into_result<T>(self, ok: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(ok) } else { Err(self) }
    }
}

/// A submitted form that can be checked into a typed, valid value.
pub trait Validate {
    type Valid;
    fn validate(&self) -> Result<Self::Valid, FormErrors>;
}

fn require(errors: &mut FormErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        false
    } else {
        true
    }
}

/// HTML checkbox semantics: absent means unchecked.
fn checkbox(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) => !matches!(v.as_str(), "" | "0" | "false" | "off" | "n" | "no"),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub remember: bool,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        checkbox(self.remember_me.as_deref())
    }
}

impl Validate for LoginForm {
    type Valid = LoginCredentials;

    fn validate(&self) -> Result<LoginCredentials, FormErrors> {
        let mut errors = FormErrors::new();
        require(&mut errors, "username", &self.username);
        require(&mut errors, "password", &self.password);
        errors.into_result(LoginCredentials {
            username: self.username.clone(),
            remember: self.remember(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
}

impl Validate for RegistrationForm {
    type Valid = Registration;

    fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::new();
        require(&mut errors, "username", &self.username);
        if require(&mut errors, "email", &self.email) && !EMAIL_RE.is_match(self.email.trim()) {
            errors.add("email", INVALID_EMAIL);
        }
        require(&mut errors, "password", &self.password);
        if require(&mut errors, "password2", &self.password2) && self.password2 != self.password {
            errors.add("password2", PASSWORDS_DIFFER);
        }
        errors.into_result(Registration {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(username: &str, password: &str, remember: Option<&str>) -> LoginForm {
        LoginForm {
            username: username.into(),
            password: password.into(),
            remember_me: remember.map(str::to_string),
            csrf_token: None,
        }
    }

    #[test]
    fn login_requires_username_and_password() {
        let errs = login("", "  ", None).validate().unwrap_err();
        assert_eq!(errs.field("username"), [REQUIRED.to_string()]);
        assert_eq!(errs.field("password"), [REQUIRED.to_string()]);
        assert!(errs.field("remember_me").is_empty());
    }

    #[test]
    fn login_keeps_username_verbatim() {
        let ok = login(" Alice ", "pw", None).validate().unwrap();
        assert_eq!(ok.username, " Alice ");
        assert!(!ok.remember);
    }

    #[test]
    fn remember_me_checkbox_values() {
        assert!(login("a", "b", Some("y")).validate().unwrap().remember);
        assert!(login("a", "b", Some("on")).validate().unwrap().remember);
        assert!(!login("a", "b", Some("false")).validate().unwrap().remember);
        assert!(!login("a", "b", Some("")).validate().unwrap().remember);
    }

    fn registration(email: &str, p1: &str, p2: &str) -> RegistrationForm {
        RegistrationForm {
            username: "newbie".into(),
            email: email.into(),
            password: p1.into(),
            password2: p2.into(),
            csrf_token: None,
        }
    }

    #[test]
    fn registration_happy_path() {
        let ok = registration("new@example.com", "s3cret", "s3cret").validate().unwrap();
        assert_eq!(ok.username, "newbie");
        assert_eq!(ok.email, "new@example.com");
    }

    #[test]
    fn registration_rejects_bad_email_and_mismatch() {
        let errs = registration("not-an-email", "a", "b").validate().unwrap_err();
        assert_eq!(errs.field("email"), [INVALID_EMAIL.to_string()]);
        assert_eq!(errs.field("password2"), [PASSWORDS_DIFFER.to_string()]);
        assert!(errs.field("username").is_empty());
    }

    #[test]
    fn registration_missing_fields() {
        let errs = RegistrationForm::default().validate().unwrap_err();
        let fields: Vec<&str> = errs.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, ["email", "password", "password2", "username"]);
    }
}
