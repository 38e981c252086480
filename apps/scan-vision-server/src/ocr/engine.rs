//! PaddleOCR pipeline over ONNX Runtime.

use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};

use super::config::OcrConfig;
use super::detector::TextDetector;
use super::postprocess::{polygon_to_bbox, DetectedBox};
use super::preprocess::crop_region;
use super::provider::OcrBackend;
use super::recognizer::{Recognition, TextRecognizer};
use super::types::{OcrError, OcrResult, RecognizedRegion};

struct Pipeline {
    detector: TextDetector,
    recognizer: TextRecognizer,
}

/// Detector and recognizer loaded from ONNX model files
#[derive(Clone)]
pub struct PaddleOcrEngine {
    pipeline: Arc<Pipeline>,
}

impl PaddleOcrEngine {
    /// Load both models. Blocking; call off the async runtime.
    pub fn load(config: &OcrConfig) -> OcrResult<Self> {
        tracing::info!(
            det = %config.det_model_path.display(),
            rec = %config.rec_model_path.display(),
            threads = config.num_threads,
            "Loading OCR models"
        );

        let detector = TextDetector::load(&config.det_model_path, config)?;
        let recognizer = TextRecognizer::load(&config.rec_model_path, &config.dict_path, config)?;

        Ok(Self {
            pipeline: Arc::new(Pipeline {
                detector,
                recognizer,
            }),
        })
    }

    fn run(&self, image: &RgbImage) -> OcrResult<Vec<RecognizedRegion>> {
        let boxes = self.pipeline.detector.detect(image)?;
        tracing::debug!(boxes = boxes.len(), "Text detection complete");

        Ok(shape_regions(image, &boxes, |crop| {
            self.pipeline.recognizer.recognize(crop)
        }))
    }
}

#[async_trait]
impl OcrBackend for PaddleOcrEngine {
    fn name(&self) -> &'static str {
        "paddle-onnx"
    }

    async fn recognize(&self, image: DynamicImage) -> OcrResult<Vec<RecognizedRegion>> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.run(&image.to_rgb8()))
            .await
            .map_err(|e| OcrError::Inference(format!("OCR task panicked: {}", e)))?
    }
}

/// Crop each detected box and recognize it.
///
/// Boxes that fall outside the image are skipped. A failed crop keeps its
/// box with empty text and zero confidence.
pub fn shape_regions<F>(
    image: &RgbImage,
    boxes: &[DetectedBox],
    mut recognize: F,
) -> Vec<RecognizedRegion>
where
    F: FnMut(&RgbImage) -> OcrResult<Recognition>,
{
    let (width, height) = image.dimensions();
    let mut regions = Vec::with_capacity(boxes.len());

    for detected in boxes {
        let Some(bbox) = polygon_to_bbox(&detected.polygon, width, height) else {
            continue;
        };

        let crop = crop_region(image, bbox);
        let recognition = recognize(&crop).unwrap_or_else(|e| {
            tracing::warn!(
                ?bbox,
                det_score = detected.score,
                "Recognition failed for region: {}",
                e
            );
            Recognition {
                text: String::new(),
                confidence: 0.0,
            }
        });

        tracing::trace!(
            ?bbox,
            det_score = detected.score,
            confidence = recognition.confidence,
            "Recognized region"
        );

        regions.push(RecognizedRegion {
            text: recognition.text,
            confidence: recognition.confidence,
            bbox,
            polygon: detected.polygon,
        });
    }

    regions
}
