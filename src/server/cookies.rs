//! Cookie parsing and `Set-Cookie` values for the session, flash and CSRF cookies.

use std::time::Duration;

use axum::http::HeaderMap;

pub const SESSION_COOKIE: &str = "investment_session";
pub const FLASH_COOKIE: &str = "flash";

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all("cookie") {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

fn base_attrs(secure: bool) -> &'static str {
    if secure { "; HttpOnly; Secure; SameSite=Lax; Path=/" } else { "; HttpOnly; SameSite=Lax; Path=/" }
}

/// Session cookie. With `max_age` it survives browser restarts ("remember me").
pub fn session_cookie(token: &str, max_age: Option<Duration>, secure: bool) -> String {
    let mut c = format!("{}={}{}", SESSION_COOKIE, token, base_attrs(secure));
    if let Some(age) = max_age {
        c.push_str(&format!("; Max-Age={}", age.as_secs()));
    }
    c
}

pub fn csrf_cookie(token: &str, secure: bool) -> String {
    format!("{}={}{}", crate::csrf::CSRF_COOKIE, token, base_attrs(secure))
}

pub fn flash_cookie(message: &str, secure: bool) -> String {
    format!("{}={}{}", FLASH_COOKIE, urlencoding::encode(message), base_attrs(secure))
}

pub fn expire_cookie(name: &str, secure: bool) -> String {
    format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0{}", name, base_attrs(secure))
}

/// Pending flash message from the previous response, if any.
pub fn read_flash(headers: &HeaderMap) -> Option<String> {
    let raw = parse_cookie(headers, FLASH_COOKIE)?;
    if raw.is_empty() || raw == "deleted" {
        return None;
    }
    urlencoding::decode(&raw).ok().map(|m| m.into_owned())
}
