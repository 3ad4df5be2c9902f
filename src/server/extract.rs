//! Request extractors that resolve the current user from the session cookie.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use super::cookies::{self, SESSION_COOKIE};
use super::{found, AppState};
use crate::identity::{CurrentUser, SessionToken, User};

pub const LOGIN_REQUIRED: &str = "Please log in to access this page.";

/// The session token (if any) and the user it resolves to. Never rejects.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: Option<SessionToken>,
    pub user: CurrentUser,
}

fn resolve(parts: &Parts, state: &AppState) -> AuthSession {
    let token = cookies::parse_cookie(&parts.headers, SESSION_COOKIE);
    let user = state.sessions.current_user(token.as_deref());
    AuthSession { token, user }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(resolve(parts, state))
    }
}

/// Guard for protected routes. Anonymous requests are redirected to the login
/// page with the original path in `next`.
#[derive(Debug, Clone)]
pub struct RequireUser {
    pub token: SessionToken,
    pub user: Arc<User>,
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = resolve(parts, state);
        match (auth.token, auth.user) {
            (Some(token), CurrentUser::User(user)) => Ok(RequireUser { token, user }),
            _ => {
                let next = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
                tracing::debug!(path = %next, "login required");
                let location = format!("/login?next={}", urlencoding::encode(next));
                let flash = cookies::flash_cookie(LOGIN_REQUIRED, state.config.secure_cookies);
                Err(found(&location, vec![flash]).into_response())
            }
        }
    }
}
