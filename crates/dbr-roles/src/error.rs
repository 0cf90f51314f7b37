//! Role Error Types

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum RolesError {
    /// Backend I/O failure. Never retried by this crate.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The named database has no usable connection.
    #[error("Database '{db_name}' is unavailable: {reason}")]
    DatabaseUnavailable { db_name: String, reason: String },

    /// A template statement failed to prepare. `index` is zero-based.
    #[error("Error testing query: statement {} `{statement}`: {message}", .index + 1)]
    TemplateValidation {
        index: usize,
        statement: String,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RolesError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn database_unavailable(db_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DatabaseUnavailable {
            db_name: db_name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) | Self::Serialization(_) => "STORAGE_FAULT",
            Self::DatabaseUnavailable { .. } => "DATABASE_UNAVAILABLE",
            Self::TemplateValidation { .. } => "TEMPLATE_VALIDATION_FAILED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Whether the operator can fix this by changing their request or config.
    /// Everything else is a system fault.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Serialization(_))
    }
}

impl From<sqlx::Error> for RolesError {
    fn from(e: sqlx::Error) -> Self {
        RolesError::Storage(e.to_string())
    }
}

/// A body that is not JSON, or not the expected shape
impl From<JsonRejection> for RolesError {
    fn from(rejection: JsonRejection) -> Self {
        RolesError::InvalidRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, RolesError>;

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for RolesError {
    fn into_response(self) -> Response {
        let status = if self.is_user_facing() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self, "Role storage fault");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_message_is_one_based() {
        let err = RolesError::TemplateValidation {
            index: 0,
            statement: "SELEKT 1".to_string(),
            message: "syntax error at or near \"SELEKT\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error testing query: statement 1 `SELEKT 1`: syntax error at or near \"SELEKT\""
        );
        assert!(err.is_user_facing());
        assert_eq!(err.code(), "TEMPLATE_VALIDATION_FAILED");
    }

    #[test]
    fn test_storage_faults_are_not_user_facing() {
        assert!(!RolesError::storage("disk full").is_user_facing());

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!RolesError::from(json_err).is_user_facing());
    }

    #[test]
    fn test_status_mapping() {
        let resp = RolesError::database_unavailable("nope", "no connection is configured").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = RolesError::storage("io").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
