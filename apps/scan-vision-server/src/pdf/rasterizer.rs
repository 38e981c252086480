//! PDF page rasterization with MuPDF.
//!
//! MuPDF is CPU bound and not async aware, so documents are opened and
//! rendered on the blocking thread pool. Pages are handed over one at a time
//! through a bounded channel; the renderer stops once the reader is dropped.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix, Pixmap};
use tokio::sync::{mpsc, oneshot};

/// PDF user space is 72 points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Rendered pages waiting for the reader
const PAGE_BUFFER: usize = 1;

/// Rasterization errors
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Invalid PDF file: {0}")]
    InvalidPdf(String),

    #[error("PDF has {pages} pages; the limit is {max}")]
    TooManyPages { pages: usize, max: usize },

    #[error("Failed to render page: {0}")]
    Render(String),

    #[error("PDF conversion timed out after {0} seconds")]
    Timeout(u64),
}

impl RasterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPdf(_) | Self::TooManyPages { .. } => StatusCode::BAD_REQUEST,
            Self::Render(_) | Self::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Sending half of a [`PageStream`]
pub type PageSender = mpsc::Sender<Result<DynamicImage, RasterError>>;

/// Pages of one document, yielded in page order
pub struct PageStream {
    page_count: usize,
    received: usize,
    pages: mpsc::Receiver<Result<DynamicImage, RasterError>>,
    timeout: Duration,
}

impl PageStream {
    /// Stream of `page_count` pages; each page must arrive within `timeout`
    pub fn channel(page_count: usize, timeout: Duration) -> (PageSender, Self) {
        let (sender, pages) = mpsc::channel(PAGE_BUFFER);
        let stream = Self {
            page_count,
            received: 0,
            pages,
            timeout,
        };
        (sender, stream)
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Next page, or `None` after the last one
    pub async fn next_page(&mut self) -> Result<Option<DynamicImage>, RasterError> {
        if self.received == self.page_count {
            return Ok(None);
        }

        match tokio::time::timeout(self.timeout, self.pages.recv()).await {
            Err(_) => Err(RasterError::Timeout(self.timeout.as_secs())),
            Ok(None) => Err(RasterError::Render(format!(
                "renderer stopped after {} of {} pages",
                self.received, self.page_count
            ))),
            Ok(Some(Err(e))) => Err(e),
            Ok(Some(Ok(page))) => {
                self.received += 1;
                Ok(Some(page))
            }
        }
    }
}

/// Converts a PDF document into a stream of page images
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn open(&self, data: Vec<u8>, dpi: u32) -> Result<PageStream, RasterError>;
}

/// Zoom factor for rendering at `dpi`
pub fn page_scale(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}

/// MuPDF-backed rasterizer
#[derive(Debug, Clone)]
pub struct MupdfRasterizer {
    max_pages: usize,
    timeout: Duration,
}

impl MupdfRasterizer {
    pub fn new(max_pages: usize, timeout: Duration) -> Self {
        Self { max_pages, timeout }
    }
}

#[async_trait]
impl PageRasterizer for MupdfRasterizer {
    async fn open(&self, data: Vec<u8>, dpi: u32) -> Result<PageStream, RasterError> {
        let (count_tx, count_rx) = oneshot::channel();
        let max_pages = self.max_pages;
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || {
            render_pages(&data, dpi, max_pages, timeout, count_tx);
        });

        match tokio::time::timeout(self.timeout, count_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RasterError::Render(
                "renderer exited before opening the document".to_string(),
            )),
            Err(_) => Err(RasterError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// Open the document, hand back a stream, then render into it page by page
fn render_pages(
    data: &[u8],
    dpi: u32,
    max_pages: usize,
    timeout: Duration,
    opened: oneshot::Sender<Result<PageStream, RasterError>>,
) {
    let (document, page_count) = match open_document(data, max_pages) {
        Ok(document) => document,
        Err(e) => {
            let _ = opened.send(Err(e));
            return;
        }
    };

    let (sender, stream) = PageStream::channel(page_count, timeout);
    if opened.send(Ok(stream)).is_err() {
        return;
    }

    let scale = page_scale(dpi);
    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();

    for index in 0..page_count {
        let page = render_page(&document, index, &matrix, &colorspace);
        let failed = page.is_err();

        if sender.blocking_send(page).is_err() {
            tracing::debug!(page = index + 1, "Page reader dropped, stopping rasterization");
            return;
        }
        if failed {
            return;
        }
    }
}

fn open_document(data: &[u8], max_pages: usize) -> Result<(Document, usize), RasterError> {
    let document = Document::from_bytes(data, "application/pdf")
        .map_err(|e| RasterError::InvalidPdf(e.to_string()))?;
    let page_count = document
        .page_count()
        .map_err(|e| RasterError::InvalidPdf(e.to_string()))?
        .max(0) as usize;

    if page_count == 0 {
        return Err(RasterError::InvalidPdf("document has no pages".to_string()));
    }
    if page_count > max_pages {
        return Err(RasterError::TooManyPages {
            pages: page_count,
            max: max_pages,
        });
    }

    Ok((document, page_count))
}

fn render_page(
    document: &Document,
    index: usize,
    matrix: &Matrix,
    colorspace: &Colorspace,
) -> Result<DynamicImage, RasterError> {
    let page = document
        .load_page(index as i32)
        .map_err(|e| RasterError::Render(format!("page {}: {}", index + 1, e)))?;
    let pixmap = page
        .to_pixmap(matrix, colorspace, false, true)
        .map_err(|e| RasterError::Render(format!("page {}: {}", index + 1, e)))?;

    let image = pixmap_to_rgb(&pixmap)?;
    tracing::debug!(
        page = index + 1,
        width = image.width(),
        height = image.height(),
        "Rasterized page"
    );
    Ok(DynamicImage::ImageRgb8(image))
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<RgbImage, RasterError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let n = pixmap.n() as usize;
    let samples = pixmap.samples();

    samples_to_rgb(samples, width, height, n)
}

/// Pack interleaved samples with `n` components per pixel into RGB
fn samples_to_rgb(
    samples: &[u8],
    width: u32,
    height: u32,
    n: usize,
) -> Result<RgbImage, RasterError> {
    if n < 3 {
        return Err(RasterError::Render(format!(
            "unsupported pixmap with {} components",
            n
        )));
    }

    let pixels = width as usize * height as usize;
    if samples.len() < pixels * n {
        return Err(RasterError::Render("pixmap buffer is truncated".to_string()));
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for pixel in samples.chunks_exact(n).take(pixels) {
        rgb.extend_from_slice(&pixel[..3]);
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| RasterError::Render("Failed to create image buffer".to_string()))
}
