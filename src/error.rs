use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong between an inbound request and a predicted price.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body failed a type, range or enum constraint.
    #[error("invalid field `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("artifact {path} is missing or corrupt: {reason}")]
    ArtifactMissing { path: String, reason: String },

    #[error("artifacts have not been loaded")]
    NotLoaded,

    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn artifact(path: impl Into<String>, reason: impl ToString) -> Self {
        ApiError::ArtifactMissing {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation { field, message } => {
                HttpResponse::build(self.status_code()).json(json!({
                    "error": "validation_error",
                    "field": field,
                    "message": message,
                }))
            }
            _ => {
                tracing::error!(error = %self, "request failed");
                HttpResponse::build(self.status_code()).json(json!({
                    "error": "internal_error",
                    "message": "Internal server error",
                }))
            }
        }
    }
}
