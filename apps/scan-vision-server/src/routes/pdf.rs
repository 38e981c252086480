//! PDF OCR endpoints
//!
//! `POST /ocr-pdf` and `POST /paddle/ocr-pdf` rasterize every page of the
//! uploaded PDF and run OCR page by page.

use axum::extract::rejection::{MultipartRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use uuid::Uuid;

use super::params::PdfQuery;
use super::{query_error, upload_error};
use crate::aggregate::{Aggregator, OcrResponse};
use crate::auth::RequireApiKey;
use crate::error::Result;
use crate::state::AppState;
use crate::upload::read_file;

#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn ocr_pdf(
    State(state): State<AppState>,
    _auth: RequireApiKey,
    query: std::result::Result<Query<PdfQuery>, QueryRejection>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>> {
    let Query(query) = query.map_err(query_error)?;
    let options = query.validate()?;

    let multipart = multipart.map_err(upload_error)?;
    let upload = read_file(multipart, state.config().limits.max_upload_bytes).await?;
    upload.ensure_pdf()?;

    // Fail before rasterizing when the models cannot load
    let ocr = state.ocr();
    ocr.backend().await?;

    let mut pages = state.rasterizer().open(upload.data, options.dpi).await?;
    tracing::info!(
        pages = pages.page_count(),
        dpi = options.dpi,
        min_conf = options.min_conf,
        "Running PDF OCR"
    );

    let mut aggregator = Aggregator::for_pdf(options.min_conf, options.dpi, options.page_markers);
    let mut page_number = 0;
    while let Some(page) = pages.next_page().await? {
        page_number += 1;
        let regions = ocr.recognize(page).await?;
        tracing::debug!(page = page_number, regions = regions.len(), "Page OCR complete");
        aggregator.push_page(regions);
    }

    let response = aggregator.finish(ocr.det_model(), ocr.rec_model());
    tracing::info!(
        pages = response.pages,
        boxes = response.total_boxes,
        "PDF OCR complete"
    );
    Ok(Json(response))
}
