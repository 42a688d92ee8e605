use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every problem found in a payload, collected before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("profile {0} not found")]
    NotFound(Uuid),
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A malformed or oversized form body, with the status the extractor chose.
    #[error("multipart error: {message}")]
    Multipart { status: StatusCode, message: String },
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Multipart { status, .. } => *status,
            AppError::Storage(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errs) => errs.to_string(),
            AppError::NotFound(_) => "Profile not found".to_string(),
            AppError::BadRequest(msg) | AppError::Multipart { message: msg, .. } => msg.clone(),
            AppError::Storage(_) | AppError::Database(_) => {
                error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
        };
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_every_field() {
        let mut errs = ValidationErrors::default();
        errs.push("email", "is required");
        errs.push("socials[1][url]", "must be an http(s) URL");
        assert!(errs.has_field("email"));
        assert_eq!(
            errs.to_string(),
            "email: is required; socials[1][url]: must be an http(s) URL"
        );
        assert!(errs.into_result().is_err());
    }

    #[test]
    fn multipart_body_is_the_extractor_message() {
        let res = AppError::Multipart {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".into(),
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::from(ValidationErrors::default()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound(Uuid::nil()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Multipart {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                message: "length limit exceeded".into(),
            }
            .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Storage(anyhow::anyhow!("disk full")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
