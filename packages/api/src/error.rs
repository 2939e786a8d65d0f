// ABOUTME: Application error type for the HTTP layer
// ABOUTME: Maps gate rejections and key store failures to structured JSON responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ctc_security::CsrfError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Message shown when the request gate rejects a mutating request
pub const CSRF_REJECTION_MESSAGE: &str = "Your request looks suspicious, so we rejected it. \
If you reached this page by following a link or submitting a form on this site, \
please go back, reload the page, and try again; \
other legitimate requests shouldn't trigger this error.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("CSRF token rejected")]
    CsrfRejected,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Key store failures are fatal for the request, never masked as a rejection
    #[error("CSRF key unavailable: {0}")]
    Csrf(#[from] CsrfError),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl AppError {
    fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::CsrfRejected => (StatusCode::FORBIDDEN, "CSRF_REJECTED"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
            AppError::Csrf(CsrfError::StorageUnavailable(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_UNAVAILABLE")
            }
            AppError::Csrf(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// User-facing message (sanitized for external consumption)
    fn to_user_message(&self) -> String {
        match self {
            AppError::CsrfRejected => CSRF_REJECTION_MESSAGE.to_string(),
            AppError::Validation(msg) => format!("Validation failed: {}", msg),
            AppError::Configuration(_) => "Server configuration error".to_string(),
            AppError::Csrf(_) => "An internal server error occurred".to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();

        match &self {
            AppError::Csrf(err) => {
                error!(
                    request_id = %request_id,
                    error = %err,
                    "CSRF secret key could not be loaded"
                );
            }
            AppError::Configuration(msg) => {
                error!(
                    request_id = %request_id,
                    config_error = %msg,
                    "Configuration error"
                );
            }
            _ => {
                info!(
                    request_id = %request_id,
                    error_code = %error_code,
                    error = %self,
                    "API error response"
                );
            }
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code.to_string(),
                message: self.to_user_message(),
            },
            request_id,
        };

        (status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, AppError>;
