use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::requests::ValidationErrors;
use crate::services::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            status: bool,
            message: String,
            errors: serde_json::Value,
        }

        let (status_code, message, errors) = match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Failed to send push notification.".to_string(),
                serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null),
            ),
            AppError::Dispatch(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Failed to send push notification.".to_string(),
                serde_json::Value::String(err.to_string()),
            ),
            AppError::Config(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                serde_json::Value::String(err.to_string()),
            ),
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                serde_json::Value::String(err.to_string()),
            ),
        };

        (
            status_code,
            Json(ErrorResponse {
                status: false,
                message,
                errors,
            }),
        )
            .into_response()
    }
}
