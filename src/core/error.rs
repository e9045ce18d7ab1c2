//! Error type system for the school registry
//!
//! This module provides:
//! - A single error enum for the whole service
//! - A dedicated authentication error taxonomy
//! - HTTP status code mapping
//! - JSON error bodies carrying a trace ID

use crate::api::middleware::trace::current_trace_id;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Authentication failures, kept distinct so callers and logs can tell them apart
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed")]
    Malformed,

    #[error("Missing bearer token")]
    MissingToken,
}

impl AuthError {
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::InvalidSignature => "InvalidSignature",
            AuthError::Expired => "TokenExpired",
            AuthError::Malformed => "MalformedToken",
            AuthError::MissingToken => "MissingToken",
        }
    }
}

/// Main error type for the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    // System-level errors
    #[error("System initialization failed: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Stored document does not match schema: {0}")]
    InvalidDocument(String),

    #[error("Task error: {0}")]
    TaskError(String),

    /// Hashing or token signing failed
    #[error("Credential operation failed: {0}")]
    CredentialError(String),

    // Request errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Downstream collaborators
    #[error("Dependency failure: {0}")]
    DependencyError(String),
}

impl RegistryError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::ValidationError(_) => StatusCode::BAD_REQUEST,
            RegistryError::Auth(_) => StatusCode::UNAUTHORIZED,
            RegistryError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::Conflict(_) => StatusCode::CONFLICT,
            RegistryError::DependencyError(_) => StatusCode::BAD_GATEWAY,

            RegistryError::InitializationError(_)
            | RegistryError::ConfigError(_)
            | RegistryError::DatabaseError(_)
            | RegistryError::PoolError(_)
            | RegistryError::InvalidDocument(_)
            | RegistryError::TaskError(_)
            | RegistryError::CredentialError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            RegistryError::InitializationError(_) => "InitializationError",
            RegistryError::ConfigError(_) => "ConfigError",
            RegistryError::DatabaseError(_) => "DatabaseError",
            RegistryError::PoolError(_) => "DatabaseError",
            RegistryError::InvalidDocument(_) => "InvalidDocument",
            RegistryError::TaskError(_) => "TaskError",
            RegistryError::CredentialError(_) => "CredentialError",
            RegistryError::ValidationError(_) => "ValidationError",
            RegistryError::Conflict(_) => "ConflictError",
            RegistryError::Auth(e) => e.error_type(),
            RegistryError::PermissionDenied(_) => "PermissionDenied",
            RegistryError::NotFound(_) => "NotFoundError",
            RegistryError::DependencyError(_) => "DependencyError",
        }
    }

    /// Internal failures are not described to the client beyond their type
    fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Unique trace ID for this error
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response carrying the current request's trace ID
    pub fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            details: None,
            trace_id: current_trace_id().unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }

    /// Create an error response with additional details
    pub fn with_details(error: String, message: String, details: serde_json::Value) -> Self {
        Self {
            details: Some(details),
            ..Self::new(error, message)
        }
    }

    /// Create an error response from a RegistryError
    pub fn from_error(error: &RegistryError) -> Self {
        Self::new(error.error_type().to_string(), error.public_message())
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (trace_id: {})",
            self.error, self.message, self.trace_id
        )
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        let mut response = (status_code, Json(error_response)).into_response();
        if matches!(self, RegistryError::Auth(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        RegistryError::from(self).into_response()
    }
}

/// Result type alias for operations that can fail with RegistryError
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            RegistryError::ValidationError("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RegistryError::Auth(AuthError::Expired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RegistryError::Conflict("test".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RegistryError::DependencyError("smtp".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RegistryError::DatabaseError(rusqlite::Error::InvalidQuery).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_types_are_distinct() {
        let kinds = [
            AuthError::InvalidCredentials,
            AuthError::InvalidSignature,
            AuthError::Expired,
            AuthError::Malformed,
            AuthError::MissingToken,
        ];
        let names: std::collections::HashSet<_> =
            kinds.iter().map(|k| RegistryError::from(k.clone()).error_type()).collect();
        assert_eq!(names.len(), kinds.len());
    }

    #[test]
    fn test_credential_errors_are_internal() {
        let error = RegistryError::CredentialError("Failed to sign token".into());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.error_type(), "CredentialError");
        assert_eq!(ErrorResponse::from_error(&error).message, "Internal server error");
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let error = RegistryError::InvalidDocument("students/42: missing field `email`".into());
        let response = ErrorResponse::from_error(&error);

        assert_eq!(response.error, "InvalidDocument");
        assert_eq!(response.message, "Internal server error");
        assert!(!response.trace_id.is_empty());
    }

    #[test]
    fn test_error_response_with_details() {
        let details = serde_json::json!({ "username": "alice" });
        let response = ErrorResponse::with_details(
            "ConflictError".into(),
            "Username already exists".into(),
            details.clone(),
        );

        assert_eq!(response.details, Some(details));
    }

    #[test]
    fn test_auth_error_sets_www_authenticate() {
        let response = RegistryError::Auth(AuthError::MissingToken).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
