//! Double-submit CSRF tokens for the HTML forms.
//!
//! Rendering a form reuses the token from the `csrf_token` cookie (or mints a
//! new one) and embeds it in a hidden field. A submit is accepted only when the
//! field matches the cookie.

use crate::error::AppResult;
use crate::identity::gen_token;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_FIELD: &str = "csrf_token";
pub const MISSING: &str = "The CSRF token is missing.";
pub const INVALID: &str = "The CSRF token is invalid.";

/// The token to embed in a freshly rendered form.
pub fn issue(existing: Option<&str>) -> AppResult<String> {
    match existing {
        Some(t) if looks_like_token(t) => Ok(t.to_string()),
        _ => gen_token(),
    }
}

/// Check a submitted token against the cookie; the error is a form message.
pub fn verify(cookie: Option<&str>, submitted: Option<&str>) -> Result<(), &'static str> {
    let submitted = submitted.map(str::trim).filter(|s| !s.is_empty()).ok_or(MISSING)?;
    let cookie = cookie.filter(|c| looks_like_token(c)).ok_or(MISSING)?;
    if constant_time_eq(cookie.as_bytes(), submitted.as_bytes()) { Ok(()) } else { Err(INVALID) }
}

fn looks_like_token(t: &str) -> bool {
    t.len() >= 32 && t.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_reuses_valid_cookie() {
        let t = issue(None).unwrap();
        assert_eq!(t.len(), 43);
        assert_eq!(issue(Some(&t)).unwrap(), t);
        assert_ne!(issue(Some("short")).unwrap(), "short");
    }

    #[test]
    fn verify_paths() {
        let t = issue(None).unwrap();
        assert_eq!(verify(Some(&t), Some(&t)), Ok(()));
        assert_eq!(verify(Some(&t), None), Err(MISSING));
        assert_eq!(verify(Some(&t), Some("")), Err(MISSING));
        assert_eq!(verify(None, Some(&t)), Err(MISSING));
        let other = issue(None).unwrap();
        assert_eq!(verify(Some(&t), Some(&other)), Err(INVALID));
    }
}
