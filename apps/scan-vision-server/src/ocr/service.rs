//! OCR Service
//!
//! Owns the OCR backend. Models load on first use; a failed load is
//! reported to the caller and retried on the next request.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::sync::OnceCell;

use super::config::OcrConfig;
use super::engine::PaddleOcrEngine;
use super::provider::OcrBackend;
use super::types::{OcrError, OcrResult, RecognizedRegion};
use crate::config::Config;

type BackendLoader = dyn Fn() -> OcrResult<Arc<dyn OcrBackend>> + Send + Sync;

/// Lazily loaded OCR backend plus the model names it reports
pub struct OcrService {
    det_model: String,
    rec_model: String,
    loader: Arc<BackendLoader>,
    backend: OnceCell<Arc<dyn OcrBackend>>,
    timeout: Duration,
}

impl OcrService {
    /// Service backed by the PaddleOCR ONNX models named in the config
    pub fn paddle(config: &Config) -> Self {
        let ocr_config = OcrConfig::from_models(&config.models);
        let loader = move || -> OcrResult<Arc<dyn OcrBackend>> {
            Ok(Arc::new(PaddleOcrEngine::load(&ocr_config)?))
        };

        Self {
            det_model: config.models.det_model.clone(),
            rec_model: config.models.rec_model.clone(),
            loader: Arc::new(loader),
            backend: OnceCell::new(),
            timeout: config.limits.ocr_timeout,
        }
    }

    /// Service with a custom loader
    pub fn with_loader<F>(config: &Config, loader: F) -> Self
    where
        F: Fn() -> OcrResult<Arc<dyn OcrBackend>> + Send + Sync + 'static,
    {
        Self {
            det_model: config.models.det_model.clone(),
            rec_model: config.models.rec_model.clone(),
            loader: Arc::new(loader),
            backend: OnceCell::new(),
            timeout: config.limits.ocr_timeout,
        }
    }

    /// Service with an already loaded backend
    pub fn with_backend(config: &Config, backend: Arc<dyn OcrBackend>) -> Self {
        let preloaded = backend.clone();
        Self {
            backend: OnceCell::new_with(Some(backend)),
            ..Self::with_loader(config, move || Ok(preloaded.clone()))
        }
    }

    pub fn det_model(&self) -> &str {
        &self.det_model
    }

    pub fn rec_model(&self) -> &str {
        &self.rec_model
    }

    /// Name of the loaded backend, `None` until the models have loaded
    pub fn loaded_backend(&self) -> Option<&'static str> {
        self.backend.get().map(|backend| backend.name())
    }

    /// Get the backend, loading the models on first use
    pub async fn backend(&self) -> OcrResult<Arc<dyn OcrBackend>> {
        let backend = self
            .backend
            .get_or_try_init(|| async {
                let loader = self.loader.clone();
                let backend = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| {
                        OcrError::EngineUnavailable(format!("model loader panicked: {}", e))
                    })?
                    .map_err(|e| OcrError::EngineUnavailable(e.to_string()))?;

                tracing::info!(backend = backend.name(), "OCR engine ready");
                Ok::<_, OcrError>(backend)
            })
            .await?;

        Ok(backend.clone())
    }

    /// Run OCR on one image, bounded by the configured timeout
    pub async fn recognize(&self, image: DynamicImage) -> OcrResult<Vec<RecognizedRegion>> {
        let backend = self.backend().await?;

        match tokio::time::timeout(self.timeout, backend.recognize(image)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout_secs = self.timeout.as_secs(), "OCR timed out");
                Err(OcrError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{region, StaticBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_lazy_load_happens_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let service = OcrService::with_loader(&Config::default(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let backend = StaticBackend::new(vec![vec![region("hello", 0.9)]]);
            Ok(Arc::new(backend) as Arc<dyn OcrBackend>)
        });

        assert_eq!(service.loaded_backend(), None);

        let image = DynamicImage::new_rgb8(10, 10);
        let first = service.recognize(image.clone()).await.unwrap();
        service.recognize(image).await.unwrap();

        assert_eq!(first[0].text, "hello");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(service.loaded_backend(), Some("static"));
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let service = OcrService::with_loader(&Config::default(), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OcrError::ModelLoad("Model file not found: det.onnx".into()))
            } else {
                Ok(Arc::new(StaticBackend::empty()) as Arc<dyn OcrBackend>)
            }
        });

        let err = service.backend().await.err().unwrap();
        match err {
            OcrError::EngineUnavailable(msg) => assert!(msg.contains("det.onnx")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(service.loaded_backend(), None);

        assert!(service.backend().await.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut config = Config::default();
        config.limits.ocr_timeout = Duration::from_millis(20);
        let backend = StaticBackend::empty().with_delay(Duration::from_millis(500));
        let service = OcrService::with_backend(&config, Arc::new(backend));

        let result = service.recognize(DynamicImage::new_rgb8(4, 4)).await;
        assert!(matches!(result, Err(OcrError::Timeout(_))));
    }

    #[test]
    fn test_model_names() {
        let service = OcrService::paddle(&Config::default());
        assert_eq!(service.det_model(), "PP-OCRv5_server_det");
        assert_eq!(service.rec_model(), "arabic_PP-OCRv5_mobile_rec");
        assert_eq!(service.loaded_backend(), None);
    }
}
