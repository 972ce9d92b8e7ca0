//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Programmer errors raised by the form API.
///
/// Validation problems are never reported through this type; they are
/// collected as error text on the form and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("the provided argument is not a valid field: {0}")]
    InvalidArgument(String),

    #[error("the field \"{0}\" does not exist")]
    NotFound(String),

    #[error("the field \"{name}\" is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Result type alias using FormError.
pub type FormResult<T> = Result<T, FormError>;

/// HTTP-layer errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Form errors reaching a handler are bugs, never client mistakes.
impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        AppError::Internal(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
