use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::filter::error::FilterError;

/// Error returned by handlers and middleware; renders as a JSON body with a matching status.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Status, stable code and client-facing message for each variant.
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::ValidationError { message, .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_REQUESTS", msg),
            ApiError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", msg)
            }
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.parts().0.as_u16()
    }

    pub fn error_code(&self) -> &'static str {
        self.parts().1
    }

    pub fn message(&self) -> &str {
        self.parts().2
    }

    /// Body shape shared by every error: `{ error, message, code }`, plus
    /// `field_errors` for validation failures.
    pub fn to_json(&self) -> Value {
        let (_, code, message) = self.parts();
        let mut body = json!({
            "error": true,
            "message": message,
            "code": code
        });
        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            body["field_errors"] = json!(field_errors);
        }
        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
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

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    /// The fixed rejection every failed CSRF check produces.
    pub fn invalid_csrf_token() -> Self {
        ApiError::Forbidden("Invalid CSRF token".to_string())
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidParameter { field, reason } => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field, reason);
                ApiError::validation_error("Invalid query parameters", Some(field_errors))
            }
            other => {
                tracing::error!("Filter error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Invalid(msg) => ApiError::unauthorized(msg),
            JwtError::WrongKind { .. } => ApiError::unauthorized(err.to_string()),
            JwtError::TokenGeneration(_) | JwtError::InvalidSecret => {
                tracing::error!("JWT error: {}", err);
                ApiError::internal_server_error("Failed to issue credentials")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.parts().0, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csrf_rejection_is_forbidden_with_fixed_message() {
        let err = ApiError::invalid_csrf_token();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_json()["message"], "Invalid CSRF token");
        assert_eq!(err.to_json()["code"], "FORBIDDEN");
    }

    #[test]
    fn filter_parameter_errors_map_to_validation_errors() {
        let err: ApiError = FilterError::InvalidParameter {
            field: "page".to_string(),
            reason: "must be a positive integer".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_json()["field_errors"]["page"], "must be a positive integer");
    }
}
