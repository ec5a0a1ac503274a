//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the service.
//! Every operation reachable from the gateway returns `Result<_, AppError>`, and each
//! variant maps onto one of the wire-level error codes (`InvalidArgument`,
//! `Unauthorized`, `NotFound`, `Internal`).
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers and the
//! authorization middleware can hand errors straight back to actix. `From`
//! implementations cover the lower-level failures (`AuthError`, `StoreError`,
//! `NotifyError`, `validator::ValidationErrors`) so the `?` operator does the mapping.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::error;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::AuthError;
use crate::reminder::NotifyError;
use crate::store::StoreError;

/// Standard error code carried by every gateway response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    Ok,
    InvalidArgument,
    Unauthorized,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorCode::Ok => "OK",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// Represents all possible errors that can occur within the service.
#[derive(Debug)]
pub enum AppError {
    /// The bearer credential was missing, invalid or carried malformed claims (HTTP 401).
    /// Always terminal for the request.
    Auth(AuthError),
    /// Authenticated, but the role or ownership does not allow the operation (HTTP 401).
    Unauthorized(String),
    /// Empty ids, over-long fields, due dates in the past (HTTP 400).
    InvalidArgument(String),
    /// The requested resource does not exist (HTTP 404).
    NotFound(String),
    /// Store or notifier failure. The cause is logged when the error is built (HTTP 500).
    Internal(String),
}

impl AppError {
    /// The wire-level code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Auth(_) | AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Auth(err) => write!(f, "Unauthenticated: {}", err),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::InvalidArgument(msg) => write!(f, "Invalid Argument: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into JSON `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::Ok => StatusCode::OK,
            ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Auth(err) => err.to_string(),
            AppError::Unauthorized(msg)
            | AppError::InvalidArgument(msg)
            | AppError::NotFound(msg) => msg.clone(),
            // Store and notifier details stay in the logs.
            AppError::Internal(_) => "internal error".to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": message,
            "code": self.code(),
        }))
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> AppError {
        AppError::Auth(error)
    }
}

/// Store failures are never retried here; the cause is logged and surfaced as `Internal`.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        error!("document store failure: {}", error);
        AppError::Internal(error.to_string())
    }
}

impl From<NotifyError> for AppError {
    fn from(error: NotifyError) -> AppError {
        error!("notifier failure: {}", error);
        AppError::Internal(error.to_string())
    }
}

/// Converts `validator::ValidationErrors` into `AppError::InvalidArgument`.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::InvalidArgument(error.to_string())
    }
}
