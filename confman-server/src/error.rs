//! Error types for confman-server
//!
//! `ApiError` is the single boundary where every failure is normalized into
//! the `{success: false, message, ...}` response shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// Uniqueness conflict (400, names the field)
    #[error("{field} already exists")]
    Conflict { field: String },

    /// Missing, invalid or expired credentials (401)
    #[error("{0}")]
    Unauthenticated(String),

    /// Correct password but the account is not verified yet (401)
    #[error("Account verification required")]
    VerificationRequired {
        user_id: Uuid,
        is_email_verified: bool,
        is_phone_verified: bool,
    },

    /// Authenticated but not allowed (403)
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("{0} not found")]
    NotFound(String),

    /// Route exists but not for this method (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Storage unreachable (503)
    #[error("Service temporarily unavailable")]
    Unavailable(String),

    /// Internal server error (500)
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) | ApiError::VerificationRequired { .. } => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<confman_common::Error> for ApiError {
    fn from(err: confman_common::Error) -> Self {
        use confman_common::Error as E;
        match err {
            E::Validation { field, message } => ApiError::Validation {
                field: Some(field),
                message,
            },
            E::InvalidInput(message) => ApiError::Validation {
                field: None,
                message,
            },
            E::Conflict { field } => ApiError::Conflict { field },
            E::NotFound(what) => ApiError::NotFound(what),
            E::Token(reason) => ApiError::Unauthenticated(format!("Invalid token: {}", reason)),
            E::Unavailable(reason) => ApiError::Unavailable(reason),
            other @ (E::Database(_) | E::Io(_) | E::Config(_) | E::Internal(_)) => {
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        confman_common::Error::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        let mut body = json!({
            "success": false,
            "message": message,
        });

        match self {
            ApiError::Validation { field: Some(field), .. } | ApiError::Conflict { field } => {
                body["field"] = Value::String(field);
            }
            ApiError::VerificationRequired {
                user_id,
                is_email_verified,
                is_phone_verified,
            } => {
                body["requiresVerification"] = Value::Bool(true);
                body["userId"] = Value::String(user_id.to_string());
                body["isEmailVerified"] = Value::Bool(is_email_verified);
                body["isPhoneVerified"] = Value::Bool(is_phone_verified);
            }
            ApiError::Unavailable(ref detail) => {
                error!(detail = %detail, "Storage unavailable");
            }
            ApiError::Internal(ref detail) => {
                error!(detail = %detail, "Request failed");
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
