//! Image OCR endpoints
//!
//! `POST /ocr` and `POST /paddle/ocr-image` take a multipart `file` with
//! an image and return the recognized text boxes.

use axum::extract::rejection::{MultipartRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use uuid::Uuid;

use super::params::ImageQuery;
use super::{query_error, upload_error};
use crate::aggregate::{Aggregator, OcrResponse};
use crate::auth::RequireApiKey;
use crate::error::Result;
use crate::state::AppState;
use crate::upload::read_file;

#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn ocr_image(
    State(state): State<AppState>,
    _auth: RequireApiKey,
    query: std::result::Result<Query<ImageQuery>, QueryRejection>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>> {
    let Query(query) = query.map_err(query_error)?;
    let min_conf = query.min_conf()?;

    let multipart = multipart.map_err(upload_error)?;
    let upload = read_file(multipart, state.config().limits.max_upload_bytes).await?;
    let image = upload.decode_image()?;

    tracing::info!(
        width = image.width(),
        height = image.height(),
        min_conf,
        "Running image OCR"
    );

    let ocr = state.ocr();
    let regions = ocr.recognize(image).await?;

    let mut aggregator = Aggregator::for_image(min_conf);
    aggregator.push_page(regions);
    let response = aggregator.finish(ocr.det_model(), ocr.rec_model());

    tracing::info!(boxes = response.total_boxes, "Image OCR complete");
    Ok(Json(response))
}
