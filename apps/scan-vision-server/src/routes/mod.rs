//! HTTP routes for the Scan Vision server

pub mod meta;
pub mod ocr;
pub mod params;
pub mod pdf;

use axum::{
    extract::{
        rejection::{MultipartRejection, QueryRejection},
        DefaultBodyLimit,
    },
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;
use crate::upload::UploadError;

/// Room for multipart framing on top of the file size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().limits.max_upload_bytes + MULTIPART_OVERHEAD;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(meta::root))
        .route("/health", get(meta::health))
        .route("/ocr", post(ocr::ocr_image))
        .route("/paddle/ocr-image", post(ocr::ocr_image))
        .route("/ocr-pdf", post(pdf::ocr_pdf))
        .route("/paddle/ocr-pdf", post(pdf::ocr_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn query_error(rejection: QueryRejection) -> AppError {
    AppError::InvalidParameter(rejection.body_text())
}

fn upload_error(rejection: MultipartRejection) -> UploadError {
    tracing::warn!("Rejected upload: {}", rejection.body_text());
    UploadError::Malformed {
        status: rejection.status(),
        message: rejection.body_text(),
    }
}
