//! Error types for Foodgram services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Field-keyed validation reports
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidQuantity,
    DuplicateReference,
    UnknownReference,
    InvalidFormat,
    PayloadTooLarge,

    // Authentication errors (2xxx)
    Unauthenticated,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,

    // Resource errors (4xxx)
    NotFound,

    // Relationship errors (5xxx)
    AlreadyExists,
    SelfReference,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Storage errors (8xxx)
    StorageError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidQuantity => 1003,
            ErrorCode::DuplicateReference => 1004,
            ErrorCode::UnknownReference => 1005,
            ErrorCode::InvalidFormat => 1006,
            ErrorCode::PayloadTooLarge => 1007,

            // Auth (2xxx)
            ErrorCode::Unauthenticated => 2001,
            ErrorCode::ExpiredToken => 2002,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,

            // Relationships (5xxx)
            ErrorCode::AlreadyExists => 5001,
            ErrorCode::SelfReference => 5002,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Storage (8xxx)
            ErrorCode::StorageError => 8001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// One rejected rule on one input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub code: ErrorCode,
    pub message: String,
}

/// Every violation found in a request payload, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation for `field`
    pub fn add(&mut self, field: &str, code: ErrorCode, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(FieldError {
                code,
                message: message.into(),
            });
    }

    pub fn single(field: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, code, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one violation
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, field: &str) -> &[FieldError] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `field` was rejected with `code`
    pub fn has(&self, field: &str, code: ErrorCode) -> bool {
        self.field(field).iter().any(|e| e.code == code)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fold in errors reported by `validator` derives
    pub fn merge_validator(&mut self, errors: &validator::ValidationErrors) {
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", error.code));
                self.add(&field, ErrorCode::InvalidFormat, message);
            }
        }
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    // Authentication errors
    #[error("Authentication required: {message}")]
    Unauthenticated { message: String },

    #[error("Token expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Resource errors
    #[error("{resource_type} not found: {id}")]
    NotFound { resource_type: String, id: String },

    // Relationship errors
    #[error("Already exists: {message}")]
    AlreadyExists { message: String },

    #[error("{message}")]
    SelfReference { message: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(resource_type: &str, id: impl fmt::Display) -> Self {
        AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn unauthenticated() -> Self {
        AppError::Unauthenticated {
            message: "Authentication credentials were not provided".to_string(),
        }
    }

    /// Translate a unique-constraint violation into `AlreadyExists`,
    /// passing every other database error through
    pub fn from_insert(err: DbErr, message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::AlreadyExists {
                message: message.into(),
            },
            _ => AppError::Database(err),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::Unauthenticated { .. } => ErrorCode::Unauthenticated,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            AppError::SelfReference { .. } => ErrorCode::SelfReference,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) |
            AppError::AlreadyExists { .. } |
            AppError::SelfReference { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthenticated { .. } |
            AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::DatabaseConnection { .. } |
            AppError::Storage { .. } |
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match &self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };

        // Storage internals stay in the logs
        let message = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            message
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::not_found("Recipe", 7);
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Recipe not found: 7");
    }

    #[test]
    fn test_relationship_errors_are_bad_requests() {
        let dup = AppError::AlreadyExists { message: "favorite".into() };
        let own = AppError::SelfReference { message: "self".into() };
        assert_eq!(dup.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(own.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(own.code(), ErrorCode::SelfReference);
    }

    #[test]
    fn test_auth_errors_are_distinct() {
        assert_eq!(AppError::unauthenticated().status_code(), StatusCode::UNAUTHORIZED);
        let denied = AppError::Forbidden { message: "not the author".into() };
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("tags", ErrorCode::MissingField, "tags are required");
        errors.add("tags", ErrorCode::UnknownReference, "unknown tag 9");
        errors.add("image", ErrorCode::MissingField, "image is required");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.field("tags").len(), 2);
        assert!(errors.has("image", ErrorCode::MissingField));
        assert!(!errors.has("image", ErrorCode::InvalidQuantity));

        let err: AppError = errors.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_validation_serializes_as_field_map() {
        let errors = ValidationErrors::single("cooking_time", ErrorCode::InvalidQuantity, "too short");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["cooking_time"][0]["code"], "INVALID_QUANTITY");
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into()
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
