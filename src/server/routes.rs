//! Route handlers. Each one is a stateless mapping from request to response;
//! the only state they touch is the identity store and the session manager.

use std::borrow::Cow;
use std::sync::Arc;

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use tracing::{info, warn};

use super::cookies::{self, FLASH_COOKIE, SESSION_COOKIE};
use super::extract::{AuthSession, RequireUser};
use super::pages::{self, LoginView, RegisterView};
use super::{found, AppState};
use crate::command::{CommandReply, CommandRequest};
use crate::csrf::{self, CSRF_COOKIE, CSRF_FIELD};
use crate::error::{AppError, AppResult};
use crate::forms::{FormErrors, LoginForm, RegistrationForm, Validate};
use crate::identity::User;

pub const REGISTERED: &str = "Congratulations, you are now a registered user!";

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

/// Only same-site absolute paths are followed after login. Non-ASCII bytes
/// are percent-encoded for the Location header.
fn local_redirect(next: Option<&str>) -> Option<Cow<'_, str>> {
    let n = next?;
    let ok = n.starts_with('/')
        && !n.starts_with("//")
        && !n.chars().any(|c| c.is_control() || c.is_whitespace() || c == '\\');
    if !ok {
        return None;
    }
    if n.is_ascii() {
        return Some(Cow::Borrowed(n));
    }
    let mut out = String::with_capacity(n.len() * 3);
    for b in n.bytes() {
        if b.is_ascii() {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    Some(Cow::Owned(out))
}

fn html_response(html: String, cookies: Vec<String>) -> Response {
    let set_cookies: Vec<_> = cookies.into_iter().map(|c| (SET_COOKIE, c)).collect();
    (StatusCode::OK, AppendHeaders(set_cookies), Html(html)).into_response()
}

/// Pending flash messages plus the cookie that consumes them.
fn take_flash(state: &AppState, headers: &HeaderMap) -> (Vec<String>, Vec<String>) {
    match cookies::read_flash(headers) {
        Some(msg) => (vec![msg], vec![cookies::expire_cookie(FLASH_COOKIE, state.config.secure_cookies)]),
        None => (Vec::new(), Vec::new()),
    }
}

/// A token to embed in a rendered form, with the cookie that pins it.
fn form_csrf(state: &AppState, headers: &HeaderMap, cookies_out: &mut Vec<String>) -> AppResult<Option<String>> {
    if !state.config.csrf_enabled {
        return Ok(None);
    }
    let existing = cookies::parse_cookie(headers, CSRF_COOKIE);
    let token = csrf::issue(existing.as_deref())?;
    if existing.as_deref() != Some(token.as_str()) {
        cookies_out.push(cookies::csrf_cookie(&token, state.config.secure_cookies));
    }
    Ok(Some(token))
}

fn csrf_error(state: &AppState, headers: &HeaderMap, submitted: Option<&str>) -> Option<&'static str> {
    if !state.config.csrf_enabled {
        return None;
    }
    let cookie = cookies::parse_cookie(headers, CSRF_COOKIE);
    csrf::verify(cookie.as_deref(), submitted).err()
}

/// Combine field validation with the CSRF check; `Ok` only when both pass.
fn checked<V>(result: Result<V, FormErrors>, csrf_err: Option<&'static str>) -> Result<V, FormErrors> {
    match (result, csrf_err) {
        (Ok(v), None) => Ok(v),
        (result, csrf_err) => {
            let mut errors = result.err().unwrap_or_default();
            if let Some(msg) = csrf_err {
                errors.add(CSRF_FIELD, msg);
            }
            Err(errors)
        }
    }
}

fn submitted<T: Default>(form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(f)) => f,
        Err(e) => {
            warn!("unreadable form submission: {}", e.body_text());
            T::default()
        }
    }
}

pub async fn index(State(state): State<AppState>, user: RequireUser, headers: HeaderMap) -> Response {
    let (flashes, cookies_out) = take_flash(&state, &headers);
    html_response(pages::index_page(&user.user, &flashes), cookies_out)
}

fn render_login(
    state: &AppState,
    headers: &HeaderMap,
    form: &LoginForm,
    next: Option<&str>,
    errors: &FormErrors,
) -> AppResult<Response> {
    let (flashes, mut cookies_out) = take_flash(state, headers);
    let token = form_csrf(state, headers, &mut cookies_out)?;
    let view = LoginView {
        username: &form.username,
        remember: form.remember(),
        next,
        csrf: token.as_deref(),
        errors,
    };
    Ok(html_response(pages::login_page(&view, &flashes), cookies_out))
}

pub async fn login_form(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(q): Query<NextParam>,
    headers: HeaderMap,
) -> AppResult<Response> {
    if auth.user.is_authenticated() {
        return Ok(found("/index", Vec::new()));
    }
    render_login(&state, &headers, &LoginForm::default(), q.next.as_deref(), &FormErrors::new())
}

pub async fn login_submit(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(q): Query<NextParam>,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Response> {
    if auth.user.is_authenticated() {
        return Ok(found("/index", Vec::new()));
    }
    let form = submitted(form);
    let csrf_err = csrf_error(&state, &headers, form.csrf_token.as_deref());
    let creds = match checked(form.validate(), csrf_err) {
        Ok(c) => c,
        Err(errors) => {
            let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
            warn!(?fields, "login form rejected");
            return render_login(&state, &headers, &form, q.next.as_deref(), &errors);
        }
    };

    let user = Arc::new(User::authenticated(creds.username));
    state.identities.add(user.clone());
    let session = match state.sessions.bind(&user, creds.remember) {
        Ok(s) => s,
        Err(e) => {
            state.identities.remove(&user.id);
            return Err(e);
        }
    };
    info!(user_id = %user.id, username = %user.name, remember = session.remember, "login");

    let max_age = session.remember.then(|| state.sessions.policy().remember_ttl);
    let session_cookie = cookies::session_cookie(&session.token, max_age, state.config.secure_cookies);
    let target = local_redirect(q.next.as_deref()).unwrap_or(Cow::Borrowed("/index"));
    Ok(found(&target, vec![session_cookie]))
}

pub async fn logout(State(state): State<AppState>, user: RequireUser) -> Response {
    // The id has to be taken before the session goes away.
    let id = user.user.id.clone();
    state.sessions.clear(&user.token);
    state.identities.remove(&id);
    info!(user_id = %id, "logout");
    found("/index", vec![cookies::expire_cookie(SESSION_COOKIE, state.config.secure_cookies)])
}

fn render_register(
    state: &AppState,
    headers: &HeaderMap,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> AppResult<Response> {
    let (flashes, mut cookies_out) = take_flash(state, headers);
    let token = form_csrf(state, headers, &mut cookies_out)?;
    let view = RegisterView { username: &form.username, email: &form.email, csrf: token.as_deref(), errors };
    Ok(html_response(pages::register_page(&view, &flashes), cookies_out))
}

pub async fn register_form(State(state): State<AppState>, auth: AuthSession, headers: HeaderMap) -> AppResult<Response> {
    if auth.user.is_authenticated() {
        return Ok(found("/index", Vec::new()));
    }
    render_register(&state, &headers, &RegistrationForm::default(), &FormErrors::new())
}

/// Validates the registration and sends the user to the login page. Nothing
/// is stored: there is no account database behind this form.
pub async fn register_submit(
    State(state): State<AppState>,
    auth: AuthSession,
    headers: HeaderMap,
    form: Result<Form<RegistrationForm>, FormRejection>,
) -> AppResult<Response> {
    if auth.user.is_authenticated() {
        return Ok(found("/index", Vec::new()));
    }
    let form = submitted(form);
    let csrf_err = csrf_error(&state, &headers, form.csrf_token.as_deref());
    match checked(form.validate(), csrf_err) {
        Ok(reg) => {
            info!(username = %reg.username, email = %reg.email, "registration accepted");
            Ok(found("/login", vec![cookies::flash_cookie(REGISTERED, state.config.secure_cookies)]))
        }
        Err(errors) => {
            let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
            warn!(?fields, "registration form rejected");
            render_register(&state, &headers, &form, &errors)
        }
    }
}

pub async fn command(
    State(state): State<AppState>,
    user: RequireUser,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> AppResult<Json<CommandReply>> {
    let Json(req) = body.map_err(|e| AppError::user("invalid_command".to_string(), e.body_text()))?;
    let reply = state.commands.process(&user.user, &req)?;
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_redirect_accepts_only_site_paths() {
        assert_eq!(local_redirect(Some("/index")).as_deref(), Some("/index"));
        assert_eq!(local_redirect(Some("/command?x=1")).as_deref(), Some("/command?x=1"));
        assert_eq!(local_redirect(Some("//evil.example")), None);
        assert_eq!(local_redirect(Some("https://evil.example/")), None);
        assert_eq!(local_redirect(Some("/\\evil")), None);
        assert_eq!(local_redirect(Some("/a b")), None);
        assert_eq!(local_redirect(Some("/a\tb")), None);
        assert_eq!(local_redirect(Some("/a\u{0}")), None);
        assert_eq!(local_redirect(None), None);
    }

    #[test]
    fn local_redirect_encodes_non_ascii_paths() {
        assert_eq!(local_redirect(Some("/café")).as_deref(), Some("/caf%C3%A9"));
        assert_eq!(local_redirect(Some("/münchen?q=ü")).as_deref(), Some("/m%C3%BCnchen?q=%C3%BC"));
        assert_eq!(local_redirect(Some("/a\u{3000}b")), None);
        assert!(matches!(local_redirect(Some("/plain")), Some(Cow::Borrowed(_))));
    }

    #[test]
    fn checked_merges_csrf_error() {
        let ok: Result<u8, FormErrors> = Ok(1);
        assert_eq!(checked(ok.clone(), None), Ok(1));
        let errs = checked(ok, Some(csrf::MISSING)).unwrap_err();
        assert_eq!(errs.field(CSRF_FIELD), [csrf::MISSING.to_string()]);
    }
}
