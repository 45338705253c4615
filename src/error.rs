use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One field-level validation failure, surfaced verbatim in 400 responses.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Carries the exact client-facing message, e.g. "Review not found.".
    #[error("{0}")]
    NotFound(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidPassword | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => json!({
                "success": false,
                "errors": errors,
            }),
            AppError::NotFound(message) => json!({
                "success": false,
                "message": message,
            }),
            AppError::InvalidPassword => json!({
                "success": false,
                "message": "Invalid password",
            }),
            AppError::Unauthorized => json!({
                "success": false,
                "message": "Unauthorized",
            }),
            AppError::Forbidden => json!({
                "success": false,
                "message": "Forbidden",
            }),
            AppError::Conflict(message) => json!({
                "success": false,
                "message": message,
            }),
            // The true cause stays in the server log.
            AppError::Database(e) => {
                error!("storage failure: {e:?}");
                json!({
                    "success": false,
                    "message": "Internal server error",
                })
            }
            AppError::Internal(e) => {
                error!("internal failure: {e}");
                json!({
                    "success": false,
                    "message": "Internal server error",
                })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
