// HTTP API Error Types
use axum::{http::header, http::HeaderValue, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::storage::StorageError;
use crate::token::TokenError;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every error renders as the uniform `{"message": ...}` envelope; messages
/// never carry secrets such as the signing key or password hashes.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed (carries the union of allowed methods)
    MethodNotAllowed { allow: Vec<String> },

    // 423 Locked (playlist edit lease held by another session)
    Locked(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed { .. } => 405,
            ApiError::Locked(_) => 423,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::MethodNotAllowed { .. } => "Method Not Allowed",
            ApiError::Locked(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({ "message": self.message() })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn method_not_allowed(allow: Vec<String>) -> Self {
        ApiError::MethodNotAllowed { allow }
    }

    pub fn locked(message: impl Into<String>) -> Self {
        ApiError::Locked(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Convert collaborator error types to ApiError
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { .. } => ApiError::bad_request(err.to_string()),
            StorageError::NotFound { .. } => ApiError::not_found(err.to_string()),
            StorageError::Internal(msg) => {
                tracing::error!("storage failure: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        let message = err.to_string();
        match err {
            TokenError::MissingToken | TokenError::Rejected => ApiError::unauthorized(message),
            TokenError::MalformedCookie | TokenError::Malformed => ApiError::bad_request(message),
            TokenError::Signing(source) => {
                tracing::error!("token signing failed: {}", source);
                ApiError::internal_server_error("Failed to sign session token")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.to_json())).into_response();

        if let ApiError::MethodNotAllowed { allow } = &self {
            if let Ok(value) = HeaderValue::from_str(&allow.join(", ")) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }

        response
    }
}
