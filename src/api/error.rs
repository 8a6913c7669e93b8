use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::debug;

use super::models::ErrorResponse;
use crate::pipeline::PipelineError;

/// Message returned for every server-side failure. Details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Failed to compress video";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            // Already logged with full detail by the pipeline
            debug!(error = %err, "Hiding internal error from client");
            ApiError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
        }
    }
}
