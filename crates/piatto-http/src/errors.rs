//! Error types.
//!
//! Two distinct failure families, per the fail-fast design: `SetupError`
//! for configuration mistakes caught while routes are registered (these
//! abort startup and never reach a client), and `ApiError` for
//! request-time failures, which the application's error hook turns into
//! the uniform client envelope.

use rand::Rng;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for request-time operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for registration-time operations
pub type SetupResult<T> = Result<T, SetupError>;

/// Registration-time configuration errors. Fatal, surfaced before the
/// server starts serving traffic.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A route rule that could not be parsed
    #[error("invalid route rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },

    /// The same method + rule registered twice within a group
    #[error("route `{rule}` is already registered for {method}")]
    DuplicateRoute { method: String, rule: String },

    /// Path descriptor fields and rule variables do not agree
    #[error("path descriptor for handler `{handler}` does not match rule `{rule}`: {reason}")]
    PathMismatch {
        handler: String,
        rule: String,
        reason: String,
    },

    /// Schema reflection failed while registering a descriptor
    #[error("schema reflection failed: {0}")]
    Schema(#[from] piatto_openapi::OpenApiError),
}

impl SetupError {
    /// Create an invalid-rule error
    pub fn invalid_rule<R: ToString, M: ToString>(rule: R, reason: M) -> Self {
        Self::InvalidRule {
            rule: rule.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a path-mismatch error
    pub fn path_mismatch<H: ToString, R: ToString, M: ToString>(
        handler: H,
        rule: R,
        reason: M,
    ) -> Self {
        Self::PathMismatch {
            handler: handler.to_string(),
            rule: rule.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Request-time errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request data failed descriptor validation
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Malformed request outside of field validation (bad JSON, ...)
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// A typed path segment did not match its converter
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Create a bad-request error
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found<T: Into<String>>(message: T) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<T: Into<String>>(message: T) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest { .. } => 400,
            ApiError::NotFound { .. } => 404,
            ApiError::Internal { .. } => 500,
        }
    }
}

/// Field-level validation failures collected while parsing one request part
#[derive(Debug, Clone, Default, Serialize, Error)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

/// A single field validation failure
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationErrors {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a failure for one field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Create a collection holding a single failure
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Whether any failure was recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Return `value` if nothing failed, otherwise self as the error
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "no validation errors")
        } else {
            write!(f, "validation failed for {} field(s):", self.errors.len())?;
            for error in &self.errors {
                write!(f, "\n  {}: {}", error.field, error.message)?;
            }
            Ok(())
        }
    }
}

const BASE62_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Base62-encode a number (compact alphanumeric form)
pub fn base62_encode(mut number: u64) -> String {
    if number == 0 {
        return "0".to_string();
    }
    let mut encoded = Vec::new();
    while number > 0 {
        encoded.push(BASE62_ALPHABET[(number % 62) as usize]);
        number /= 62;
    }
    encoded.reverse();
    // Alphabet bytes are ASCII.
    String::from_utf8(encoded).unwrap_or_default()
}

/// Random opaque identifier clients can quote when reporting an error.
/// Carries no internal detail; only useful for correlating logs.
pub fn error_hint() -> String {
    let number = rand::thread_rng().gen_range(14_776_338..916_132_832u64);
    base62_encode(number)
}
