//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::ocr::OcrService;
use crate::pdf::{MupdfRasterizer, PageRasterizer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    ocr: OcrService,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl AppState {
    /// State with the PaddleOCR engine and the MuPDF rasterizer.
    ///
    /// Models are not loaded here; see [`OcrService::backend`].
    pub fn new(config: Config) -> Self {
        let ocr = OcrService::paddle(&config);
        let rasterizer = Arc::new(MupdfRasterizer::new(
            config.limits.max_pdf_pages,
            config.limits.ocr_timeout,
        ));
        Self::with_components(config, ocr, rasterizer)
    }

    pub fn with_components(
        config: Config,
        ocr: OcrService,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                ocr,
                rasterizer,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the OCR service
    pub fn ocr(&self) -> &OcrService {
        &self.inner.ocr
    }

    /// Get the PDF rasterizer
    pub fn rasterizer(&self) -> &dyn PageRasterizer {
        self.inner.rasterizer.as_ref()
    }
}
