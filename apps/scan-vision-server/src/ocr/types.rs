//! OCR Types
//!
//! Defines the per-region inference output and OCR error types.

/// One detected and recognized text region, in image pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedRegion {
    /// Recognized text (may be empty when recognition produced nothing)
    pub text: String,
    /// Recognition confidence (0-1)
    pub confidence: f32,
    /// Axis-aligned box `[x1, y1, x2, y2]`, clamped to the image
    pub bbox: [u32; 4],
    /// Detector quadrilateral: top-left, top-right, bottom-right, bottom-left
    pub polygon: [[f32; 2]; 4],
}

/// Result type alias for OCR operations
pub type OcrResult<T> = std::result::Result<T, OcrError>;

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Failed to load OCR model: {0}")]
    ModelLoad(String),

    #[error("Character dictionary error: {0}")]
    Dictionary(String),

    #[error("Invalid image for OCR: {0}")]
    InvalidImage(String),

    #[error("OCR inference failed: {0}")]
    Inference(String),

    #[error("OCR timed out after {0} seconds")]
    Timeout(u64),
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidImage(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
