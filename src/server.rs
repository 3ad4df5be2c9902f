//!
//! investment_web HTTP server
//! ---------------------------
//! Axum application serving the login, registration and command routes.
//!
//! Responsibilities:
//! - Cookie-token sessions backed by the in-process identity store.
//! - Login/logout/register HTML forms with CSRF tokens and flash messages.
//! - The authenticated JSON `/command` endpoint.
//! - Background sweeping of expired sessions.

use std::sync::Arc;

use anyhow::Context;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::command::{CommandProcessor, EchoUserId};
use crate::config::Config;
use crate::identity::{IdentityStore, SessionManager};

pub mod cookies;
pub mod extract;
pub mod pages;
pub mod routes;

/// Shared server state injected into all handlers.
///
/// Owns the identity store and the session manager that resolves users
/// through it, plus the processor behind `/command`.
#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<IdentityStore>,
    pub sessions: Arc<SessionManager>,
    pub commands: Arc<dyn CommandProcessor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_commands(config, Arc::new(EchoUserId))
    }

    pub fn with_commands(config: Config, commands: Arc<dyn CommandProcessor>) -> Self {
        let identities = Arc::new(IdentityStore::new());
        let sessions = Arc::new(SessionManager::new(identities.clone(), config.session_policy()));
        Self { identities, sessions, commands, config: Arc::new(config) }
    }

    /// Drop expired sessions and the identities of users left without one.
    /// Returns how many identities were released.
    pub fn sweep_expired_sessions(&self) -> usize {
        let released = self.sessions.sweep_expired();
        for id in &released {
            self.identities.remove(id);
        }
        released.len()
    }
}

/// 302 redirect carrying any cookies to set.
pub(crate) fn found(location: &str, cookies: Vec<String>) -> Response {
    let set_cookies: Vec<_> = cookies.into_iter().map(|c| (SET_COOKIE, c)).collect();
    (StatusCode::FOUND, AppendHeaders(set_cookies), [(LOCATION, location.to_string())]).into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/index", get(routes::index))
        .route("/login", get(routes::login_form).post(routes::login_submit))
        .route("/logout", get(routes::logout))
        .route("/register", get(routes::register_form).post(routes::register_submit))
        .route("/command", get(routes::command).post(routes::command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_session_sweeper(state: &AppState) {
    let Some(interval) = state.config.sweep_interval else {
        info!("session sweeper disabled");
        return;
    };
    let state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let released = state.sweep_expired_sessions();
            if released > 0 {
                tracing::debug!(released, users = state.identities.len(), "session_sweep");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    let state = AppState::new(config);
    spawn_session_sweeper(&state);

    let app = router(state);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding HTTP listener on {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}
