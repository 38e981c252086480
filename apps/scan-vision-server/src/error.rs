//! Error types for the Scan Vision server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ocr::OcrError;
use crate::pdf::RasterError;
use crate::upload::UploadError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("PDF error: {0}")]
    Raster(#[from] RasterError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidParameter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Upload(e) => e.status_code(),
            AppError::Ocr(e) => e.status_code(),
            AppError::Raster(e) => e.status_code(),
        }
    }

    /// Message shown to the caller. Server-side failures are logged and hidden.
    fn detail(&self) -> String {
        match self {
            AppError::InvalidParameter(msg) => msg.clone(),
            AppError::Unauthorized => self.to_string(),
            AppError::Upload(e) => e.to_string(),
            AppError::Ocr(OcrError::EngineUnavailable(msg)) => {
                tracing::error!("OCR engine unavailable: {}", msg);
                format!("OCR engine not available: {}", msg)
            }
            AppError::Ocr(OcrError::InvalidImage(msg)) => {
                tracing::debug!("Rejected image: {}", msg);
                "Invalid image file".to_string()
            }
            AppError::Ocr(e) => {
                tracing::error!("OCR failure: {}", e);
                "OCR processing failed".to_string()
            }
            AppError::Raster(
                e @ (RasterError::InvalidPdf(_) | RasterError::TooManyPages { .. }),
            ) => e.to_string(),
            AppError::Raster(e) => {
                tracing::error!("PDF rasterization failure: {}", e);
                "Failed to convert PDF pages".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            detail: self.detail(),
        });

        (status, body).into_response()
    }
}
