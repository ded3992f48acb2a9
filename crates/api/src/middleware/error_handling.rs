//! # Error Handling Middleware
//!
//! This module provides a standardized way to handle errors in the CareSync
//! API. It maps domain-specific errors to appropriate HTTP status codes and
//! JSON error responses, ensuring a consistent error handling experience
//! across the entire API.
//!
//! The mapping distinguishes the cases a caller acts on differently:
//! "not your appointment" (403), "too late to confirm" (409), and "no
//! driver currently free" (409, surfaced as assignment pending with the
//! appointment left in its prior status).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use caresync_core::errors::CoordError;

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps domain-specific `CoordError` instances and implements
/// `IntoResponse` to convert them into HTTP responses with appropriate
/// status codes and JSON payloads.
#[derive(Debug)]
pub struct AppError(pub CoordError);

/// Converts application errors to HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map error types to HTTP status codes
        let status = match &self.0 {
            CoordError::InvalidTransition { .. } => StatusCode::CONFLICT,
            CoordError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoordError::UnknownParty(_) => StatusCode::NOT_FOUND,
            CoordError::NoDriverAvailable => StatusCode::CONFLICT,
            CoordError::InsufficientStock { .. } => StatusCode::CONFLICT,
            CoordError::InvalidReturn(_) => StatusCode::CONFLICT,
            CoordError::WindowClosed(_) => StatusCode::CONFLICT,
            CoordError::NotFound(_) => StatusCode::NOT_FOUND,
            CoordError::Validation(_) => StatusCode::BAD_REQUEST,
            CoordError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Retryable errors carry a hint the caller can act on
        let body = if self.0.is_retryable() {
            Json(json!({
                "error": self.0.to_string(),
                "retryable": true,
                "detail": "driver assignment pending; the appointment remains confirmed",
            }))
        } else {
            Json(json!({ "error": self.0.to_string() }))
        };

        // Combine status code and JSON body into a response
        (status, body).into_response()
    }
}

/// Automatic conversion from CoordError to AppError
///
/// This implementation allows using `?` operator with functions that return
/// `Result<T, CoordError>` in handler functions that return
/// `Result<T, AppError>`.
impl From<CoordError> for AppError {
    fn from(err: CoordError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// Wraps the eyre error in a CoordError::Database variant so repository
/// results propagate with `?`.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(CoordError::Database(err))
    }
}

/// Maps a CoordError to an HTTP response
///
/// This function is provided for code that directly uses the error
/// mapping function.
pub fn map_error(err: CoordError) -> Response {
    AppError(err).into_response()
}
