//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
/// All of these are terminal for the triggering call; nothing is retried
/// internally.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing, unknown, or inactive API keys
/// - **Resource Errors**: Unknown users, requests, or keys
/// - **Workflow Errors**: Responses that violate the request state machine
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No API key was supplied with the request.
    ///
    /// Logged separately from [`AppError::InvalidApiKey`] so operators can
    /// tell misconfigured clients from revoked or guessed keys, but both
    /// surface to the caller as HTTP 401.
    #[error("API key is not provided")]
    MissingApiKey,

    /// The supplied API key is unknown or has been deactivated.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Requested user does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("User not found")]
    UserNotFound,

    /// Requested meeting request does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Meeting request not found")]
    RequestNotFound,

    /// The API key to deactivate is unknown or already inactive.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("API key not found")]
    ApiKeyNotFound,

    /// Authenticated caller is not the addressed receiver of the request.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("You do not have permission to respond to this meeting request")]
    Forbidden,

    /// The request already transitioned out of PENDING.
    ///
    /// Returns HTTP 409 Conflict, distinguishable from generic validation
    /// failures so a client can render "already answered".
    #[error("Meeting request already processed")]
    AlreadyProcessed,

    /// The accepted slot is not one of the offered candidates.
    ///
    /// Returns HTTP 422 Unprocessable Entity. There is no fuzzy matching;
    /// the receiver must pick verbatim from the offered set.
    #[error("The selected time slot is not among the offered slots")]
    InvalidSelection,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Internal invariant violation (e.g., a corrupt stored record).
    ///
    /// Returns HTTP 500 Internal Server Error with details hidden.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::MissingApiKey | AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "authentication_failed",
                self.to_string(),
            ),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", self.to_string()),
            AppError::RequestNotFound => {
                (StatusCode::NOT_FOUND, "request_not_found", self.to_string())
            }
            AppError::ApiKeyNotFound => {
                (StatusCode::NOT_FOUND, "api_key_not_found", self.to_string())
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::AlreadyProcessed => (
                StatusCode::CONFLICT,
                "request_already_processed",
                self.to_string(),
            ),
            AppError::InvalidSelection => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_selection",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
