//! Test fixtures shared across modules

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;

use crate::config::Config;
use crate::ocr::{OcrBackend, OcrResult, OcrService, RecognizedRegion};
use crate::pdf::{PageRasterizer, PageStream, RasterError};
use crate::state::AppState;

pub const BOUNDARY: &str = "scan-vision-test-boundary";

/// Region with a fixed box
pub fn region(text: &str, confidence: f32) -> RecognizedRegion {
    RecognizedRegion {
        text: text.to_string(),
        confidence,
        bbox: [2, 3, 40, 20],
        polygon: [[2.0, 3.0], [40.0, 3.0], [40.0, 20.0], [2.0, 20.0]],
    }
}

/// White PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// Backend returning canned regions, one entry per call, cycling
pub struct StaticBackend {
    responses: Vec<Vec<RecognizedRegion>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StaticBackend {
    pub fn new(responses: Vec<Vec<RecognizedRegion>>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrBackend for StaticBackend {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn recognize(&self, _image: DynamicImage) -> OcrResult<Vec<RecognizedRegion>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.responses.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.responses[call % self.responses.len()].clone())
    }
}

/// Rasterizer streaming blank pages without MuPDF
pub struct FakeRasterizer {
    pages: usize,
    error: Option<String>,
    dpis: Mutex<Vec<u32>>,
    rendered: Arc<AtomicUsize>,
}

impl FakeRasterizer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            error: None,
            dpis: Mutex::new(Vec::new()),
            rendered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call fails with `InvalidPdf(reason)`
    pub fn invalid(reason: &str) -> Self {
        Self {
            error: Some(reason.to_string()),
            ..Self::new(0)
        }
    }

    /// DPI values requested so far
    pub fn dpis(&self) -> Vec<u32> {
        self.dpis.lock().clone()
    }

    /// Pages produced so far, including any not yet read
    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn open(&self, _data: Vec<u8>, dpi: u32) -> Result<PageStream, RasterError> {
        self.dpis.lock().push(dpi);
        if let Some(reason) = &self.error {
            return Err(RasterError::InvalidPdf(reason.clone()));
        }

        let (sender, stream) = PageStream::channel(self.pages, Duration::from_secs(5));
        let (pages, rendered) = (self.pages, self.rendered.clone());
        tokio::task::spawn_blocking(move || {
            for _ in 0..pages {
                rendered.fetch_add(1, Ordering::SeqCst);
                if sender.blocking_send(Ok(DynamicImage::new_rgb8(20, 20))).is_err() {
                    return;
                }
            }
        });
        Ok(stream)
    }
}

/// State with a preloaded backend
pub fn test_state(
    config: Config,
    backend: Arc<StaticBackend>,
    rasterizer: Arc<FakeRasterizer>,
) -> AppState {
    let ocr = OcrService::with_backend(&config, backend);
    AppState::with_components(config, ocr, rasterizer)
}

/// Multipart body with a single file field
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// POST request carrying a multipart body
pub fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
