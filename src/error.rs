use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Device não encontrado")]
    DeviceNotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Error body returned by every failing endpoint
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl RegistryError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            RegistryError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            RegistryError::InvalidInput(_) => "INVALID_INPUT",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.to_error_code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.to_error_code(), "Request rejected");
        }
        (status, Json(self.to_error_response())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
