// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for tctalent-core.
//!
//! Every service returns [`CoreError`]. The HTTP layer maps each variant to a
//! status code and the stable code string from [`CoreError::error_code`].

use std::fmt;

use crate::salesforce::SalesforceError;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the domain services.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// A referenced object does not exist.
    NoSuchObject {
        /// Kind of object, e.g. "TaskAssignment".
        object_type: String,
        /// Identifier that was looked up.
        id: String,
    },

    /// An object with the same unique attribute already exists.
    EntityExists {
        /// Kind of object.
        object_type: String,
        /// The conflicting attribute value.
        value: String,
    },

    /// The request is malformed or not allowed in the current state.
    InvalidRequest {
        /// Human readable reason.
        message: String,
    },

    /// The caller is not logged in with the required identity.
    InvalidSession {
        /// Human readable reason.
        message: String,
    },

    /// The caller is logged in but may not perform the action.
    UnauthorisedAction {
        /// Human readable reason.
        message: String,
    },

    /// Salesforce rejected a request or could not be reached.
    Salesforce {
        /// Error details from the Salesforce client.
        message: String,
    },

    /// The file store failed.
    FileSystem {
        /// Operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Database operation failed.
    DatabaseError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl CoreError {
    /// Shorthand for [`CoreError::NoSuchObject`].
    pub fn no_such_object(object_type: &str, id: impl ToString) -> Self {
        Self::NoSuchObject {
            object_type: object_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for [`CoreError::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSuchObject { .. } => "NO_SUCH_OBJECT",
            Self::EntityExists { .. } => "ENTITY_EXISTS",
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::InvalidSession { .. } => "INVALID_SESSION",
            Self::UnauthorisedAction { .. } => "UNAUTHORISED_ACTION",
            Self::Salesforce { .. } => "SALESFORCE_ERROR",
            Self::FileSystem { .. } => "FILE_SYSTEM_ERROR",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchObject { object_type, id } => {
                write!(f, "Missing {} with id '{}'", object_type, id)
            }
            Self::EntityExists { object_type, value } => {
                write!(f, "{} '{}' already exists", object_type, value)
            }
            Self::InvalidRequest { message }
            | Self::InvalidSession { message }
            | Self::UnauthorisedAction { message }
            | Self::Salesforce { message } => write!(f, "{}", message),
            Self::FileSystem { operation, details } => {
                write!(f, "File system error during '{}': {}", operation, details)
            }
            Self::DatabaseError { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::DatabaseError {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::DatabaseError {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::FileSystem {
            operation: "io".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<SalesforceError> for CoreError {
    fn from(err: SalesforceError) -> Self {
        match err {
            SalesforceError::InvalidRequest(message) => CoreError::InvalidRequest { message },
            other => CoreError::Salesforce {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let test_cases = vec![
            (CoreError::no_such_object("Task", 7), "NO_SUCH_OBJECT"),
            (
                CoreError::EntityExists {
                    object_type: "Task".to_string(),
                    value: "Upload CV".to_string(),
                },
                "ENTITY_EXISTS",
            ),
            (CoreError::invalid_request("bad"), "INVALID_REQUEST"),
            (
                CoreError::InvalidSession {
                    message: "not logged in".to_string(),
                },
                "INVALID_SESSION",
            ),
            (
                CoreError::UnauthorisedAction {
                    message: "nope".to_string(),
                },
                "UNAUTHORISED_ACTION",
            ),
            (
                CoreError::Salesforce {
                    message: "down".to_string(),
                },
                "SALESFORCE_ERROR",
            ),
            (
                CoreError::FileSystem {
                    operation: "upload".to_string(),
                    details: "disk full".to_string(),
                },
                "FILE_SYSTEM_ERROR",
            ),
            (
                CoreError::DatabaseError {
                    operation: "insert".to_string(),
                    details: "connection refused".to_string(),
                },
                "DATABASE_ERROR",
            ),
        ];

        for (error, expected_code) in test_cases {
            assert_eq!(error.error_code(), expected_code, "for {:?}", error);
        }
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CoreError::no_such_object("TaskAssignment", 42).to_string(),
            "Missing TaskAssignment with id '42'"
        );
        assert_eq!(
            CoreError::invalid_request("Missing answer to question").to_string(),
            "Missing answer to question"
        );
    }

    #[test]
    fn test_salesforce_invalid_request_maps_to_invalid_request() {
        let err: CoreError = SalesforceError::InvalidRequest("too many".to_string()).into();
        assert!(matches!(err, CoreError::InvalidRequest { .. }));

        let err: CoreError = SalesforceError::Api {
            status: 400,
            body: "MALFORMED_QUERY".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "SALESFORCE_ERROR");
        assert!(err.to_string().contains("MALFORMED_QUERY"));
    }

    #[test]
    fn test_from_sqlx_error() {
        let err: CoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, CoreError::DatabaseError { .. }));
    }
}
