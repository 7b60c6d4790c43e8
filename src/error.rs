use actix_web::{http::{header::ContentType, StatusCode}, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::views;

/// Failures a handler cannot answer with a flash message. Expected problems
/// such as invalid input or a taken email address never become an `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlite::Error),

    #[error("Password hashing failed: {0}")]
    Password(String),

    #[error("Session token error: {0}")]
    Session(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            AppError::NotFound(message) => message.clone(),
            other => {
                error!("Request failed: {}", other);
                "Ein interner Fehler ist aufgetreten. Bitte versuchen Sie es später erneut.".to_string()
            }
        };

        HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(views::error_page(status.as_u16(), &message))
    }
}
