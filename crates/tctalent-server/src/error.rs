// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP error responses.
//!
//! | Error | Status | Code |
//! |-------|--------|------|
//! | `NoSuchObject` | 404 | `no_such_object` |
//! | `InvalidSession` | 401 | `invalid_session` |
//! | bad credentials | 401 | `invalid_credentials` |
//! | `UnauthorisedAction` | 403 | `unauthorised_action` |
//! | `EntityExists` | 400 | `entity_exists` |
//! | `InvalidRequest` | 400 | `invalid_request` |
//! | `Salesforce` | 400 | `salesforce_error` |
//! | anything else | 500 | `unexpected_exception` |

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use tctalent_core::CoreError;
use tracing::error;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub code: &'static str,
    pub message: String,
}

/// Error returned by handlers and extractors.
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    /// A token was presented but does not verify.
    InvalidCredentials(String),
}

impl ApiError {
    pub fn invalid_session(message: impl Into<String>) -> Self {
        Self::Core(CoreError::InvalidSession {
            message: message.into(),
        })
    }

    pub fn unauthorised(message: impl Into<String>) -> Self {
        Self::Core(CoreError::UnauthorisedAction {
            message: message.into(),
        })
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::Core(CoreError::invalid_request(message))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidCredentials(_) => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            Self::Core(e) => match e {
                CoreError::NoSuchObject { .. } => (StatusCode::NOT_FOUND, "no_such_object"),
                CoreError::InvalidSession { .. } => (StatusCode::UNAUTHORIZED, "invalid_session"),
                CoreError::UnauthorisedAction { .. } => {
                    (StatusCode::FORBIDDEN, "unauthorised_action")
                }
                CoreError::EntityExists { .. } => (StatusCode::BAD_REQUEST, "entity_exists"),
                CoreError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
                CoreError::Salesforce { .. } => (StatusCode::BAD_REQUEST, "salesforce_error"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "unexpected_exception"),
            },
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::invalid_request(format!("Invalid multipart request: {}", e.body_text()))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(e) => write!(f, "{}", e),
            Self::InvalidCredentials(message) => f.write_str(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, "Unexpected error handling request");
        }

        let body = ErrorBody {
            timestamp: Utc::now().timestamp_millis(),
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(CoreError::no_such_object("Task", 1)), 404, "no_such_object"),
            (ApiError::invalid_session("no token"), 401, "invalid_session"),
            (ApiError::InvalidCredentials("bad".into()), 401, "invalid_credentials"),
            (ApiError::unauthorised("not yours"), 403, "unauthorised_action"),
            (ApiError::invalid_request("bad"), 400, "invalid_request"),
            (
                ApiError::from(CoreError::Salesforce {
                    message: "down".into(),
                }),
                400,
                "salesforce_error",
            ),
            (
                ApiError::from(CoreError::DatabaseError {
                    operation: "query".into(),
                    details: "locked".into(),
                }),
                500,
                "unexpected_exception",
            ),
        ];
        for (error, status, code) in cases {
            let (actual_status, actual_code) = error.status_and_code();
            assert_eq!(actual_status.as_u16(), status, "{}", code);
            assert_eq!(actual_code, code);
        }
    }

    #[test]
    fn test_message_is_core_display() {
        let error = ApiError::from(CoreError::no_such_object("TaskAssignment", 7));
        assert_eq!(error.to_string(), "Missing TaskAssignment with id '7'");
    }
}
