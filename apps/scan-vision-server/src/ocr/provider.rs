//! OCR Backends
//!
//! The service talks to the recognition pipeline through this trait so the
//! HTTP layer can run without model files.

use async_trait::async_trait;
use image::DynamicImage;

use super::types::{OcrResult, RecognizedRegion};

/// Detection + recognition over one image
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Short backend name reported by the root endpoint
    fn name(&self) -> &'static str;

    /// Detect and recognize text regions, in reading order
    async fn recognize(&self, image: DynamicImage) -> OcrResult<Vec<RecognizedRegion>>;
}
