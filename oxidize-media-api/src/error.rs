use std::fmt;

use axum::extract::multipart::MultipartError;
use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use oxidize_media::TransformError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message describing what went wrong
    pub error: String,
}

/// Endpoint families, each with the fixed message shown when processing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Image,
    Crop,
    Pdf,
    Rotate,
    Merge,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Image => "Error processing image",
            Operation::Crop => "Error cropping image: make sure the area is inside the image",
            Operation::Pdf => "Error processing PDF",
            Operation::Rotate => "Error rotating PDF",
            Operation::Merge => "Error merging PDF files",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Image => "image",
            Operation::Crop => "crop",
            Operation::Pdf => "pdf",
            Operation::Rotate => "rotate",
            Operation::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// Application-specific error types for the API
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: invalid or missing API key")]
    Unauthorized,

    /// Malformed or oversized multipart body
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{operation} request failed: {source}")]
    Transform {
        operation: Operation,
        #[source]
        source: TransformError,
    },

    /// The blocking worker panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(#[from] JoinError),
}

impl AppError {
    pub fn transform(operation: Operation) -> impl FnOnce(TransformError) -> AppError {
        move |source| AppError::Transform { operation, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Multipart(err) => err.status(),
            AppError::Transform { source, .. } if source.is_client_error() => {
                StatusCode::BAD_REQUEST
            }
            AppError::Transform { .. } | AppError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_msg = match &self {
            AppError::Unauthorized => self.to_string(),
            AppError::Multipart(err) => {
                warn!(error = %err, "Rejected multipart body");
                err.body_text()
            }
            AppError::Transform { source, .. } if source.is_client_error() => source.to_string(),
            AppError::Transform { operation, source } => {
                error!(%operation, error = %source, detail = ?source, "Request processing failed");
                operation.failure_message().to_string()
            }
            AppError::Worker(err) => {
                error!(error = %err, "Blocking worker failed");
                "Internal server error".to_string()
            }
        };

        let error_response = ErrorResponse { error: error_msg };

        (status, Json(error_response)).into_response()
    }
}
