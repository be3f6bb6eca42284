//! Error types for Autostelle server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{realtime::StoreError, services::identity::IdentityError};

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    RemoteFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    Duplicate = 6,
    EmailNotVerified = 7,
    ScanInProgress = 8,
    TooManyRequests = 9,
    IdentityFailure = 10,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Email not verified: {0}")]
    EmailNotVerified(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Scan in progress: {0}")]
    ScanInProgress(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Remote store error: {0}")]
    Remote(#[from] StoreError),

    /// Remote failure with an operator-facing message
    #[error("{message}: {source}")]
    RemoteOperation {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a store failure with the message shown to the operator
    pub fn remote(message: impl Into<String>, source: StoreError) -> Self {
        AppError::RemoteOperation {
            message: message.into(),
            source,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::EmailNotVerified(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::EmailNotVerified, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::ScanInProgress(msg) => {
                (StatusCode::CONFLICT, ErrorCode::ScanInProgress, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Remote(e) => {
                tracing::error!("Remote store error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorCode::RemoteFailure,
                    "Remote store error".to_string(),
                )
            }
            AppError::RemoteOperation { message, source } => {
                tracing::error!("{}: {:?}", message, source);
                (StatusCode::BAD_GATEWAY, ErrorCode::RemoteFailure, message.clone())
            }
            AppError::Identity(e) => identity_error_parts(e),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Operator-facing messages for sign-in failures
fn identity_error_parts(error: &IdentityError) -> (StatusCode, ErrorCode, String) {
    tracing::warn!("Identity provider error: {}", error);
    match error {
        IdentityError::InvalidCredential => (
            StatusCode::UNAUTHORIZED,
            ErrorCode::NotAuthorized,
            "Invalid email or password.".to_string(),
        ),
        IdentityError::InvalidEmail => (
            StatusCode::BAD_REQUEST,
            ErrorCode::BadValue,
            "Please enter a properly formatted email address.".to_string(),
        ),
        IdentityError::Network(_) => (
            StatusCode::BAD_GATEWAY,
            ErrorCode::IdentityFailure,
            "Network error. Please check your internet connection or try disabling ad blockers."
                .to_string(),
        ),
        IdentityError::TooManyRequests => (
            StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::TooManyRequests,
            "Too many failed attempts. Please try again later.".to_string(),
        ),
        IdentityError::Provider(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::IdentityFailure,
            "Something went wrong. Please try again.".to_string(),
        ),
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
