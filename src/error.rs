//! Unified application error model and mapping helpers.
//! Handlers return `AppResult<T>`; errors render as a JSON body with the
//! matching HTTP status so clients never see a raw failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::UserInput { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(code = self.code_str(), "request failed: {}", self.message());
        }
        (status, Json(serde_json::json!({ "status": "error", "error": self }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::internal("internal", "panic").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn serializes_with_type_tag() {
        let v = serde_json::to_value(AppError::user("missing_command", "no command")).unwrap();
        assert_eq!(v["type"], "user_input");
        assert_eq!(v["code"], "missing_command");
        assert_eq!(v["message"], "no command");
    }

    #[test]
    fn anyhow_maps_to_internal() {
        let e: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(e.code_str(), "internal_error");
        assert_eq!(e.to_string(), "internal_error: boom");
    }
}
