//! Text detection with the PP-OCR DB detector.
//!
//! The detector outputs a per-pixel text probability map; boxes are
//! recovered by [`super::postprocess::extract_boxes`].

use std::path::Path;

use image::RgbImage;
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;

use super::config::OcrConfig;
use super::postprocess::{extract_boxes, DbParams, DetectedBox, MapGeometry};
use super::preprocess::detection_input;
use super::types::{OcrError, OcrResult};

/// Text detector backed by an ONNX Runtime session
pub struct TextDetector {
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    limit_side_len: u32,
    params: DbParams,
}

impl TextDetector {
    pub fn load(model_path: &Path, config: &OcrConfig) -> OcrResult<Self> {
        let session = build_session(model_path, config.num_threads)?;

        Ok(Self {
            session: Mutex::new(session),
            limit_side_len: config.det_limit_side_len,
            params: DbParams {
                threshold: config.det_threshold,
                box_threshold: config.box_threshold,
                unclip_ratio: config.unclip_ratio,
                max_candidates: config.max_candidates,
                ..DbParams::default()
            },
        })
    }

    /// Detect text regions, returned in reading order
    pub fn detect(&self, image: &RgbImage) -> OcrResult<Vec<DetectedBox>> {
        let input = detection_input(image, self.limit_side_len)?;
        let prob_map = self.run_inference(&input.tensor)?;

        let geometry = MapGeometry {
            ratio_w: input.ratio_w,
            ratio_h: input.ratio_h,
            image_width: image.width(),
            image_height: image.height(),
        };
        Ok(extract_boxes(prob_map.view(), &self.params, geometry))
    }

    fn run_inference(&self, input: &Array4<f32>) -> OcrResult<Array2<f32>> {
        let mut session = self.session.lock();

        let input_tensor = TensorRef::from_array_view(input)
            .map_err(|e| OcrError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs!["x" => input_tensor])
            .map_err(|e| OcrError::Inference(format!("Detection failed: {}", e)))?;

        let (_, output_tensor) = outputs
            .iter()
            .next()
            .ok_or_else(|| OcrError::Inference("No output tensor found".to_string()))?;

        let output = output_tensor
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::Inference(format!("Failed to extract output: {}", e)))?;

        // [N, 1, H, W]
        let shape = output.shape();
        if shape.len() != 4 {
            return Err(OcrError::Inference(format!(
                "Unexpected detection output shape: {:?}",
                shape
            )));
        }

        let (height, width) = (shape[2], shape[3]);
        Ok(Array2::from_shape_fn((height, width), |(y, x)| output[[0, 0, y, x]]))
    }
}

/// Open an ONNX model with the configured thread count
pub(super) fn build_session(model_path: &Path, num_threads: usize) -> OcrResult<Session> {
    if !model_path.exists() {
        return Err(OcrError::ModelLoad(format!(
            "Model file not found: {}",
            model_path.display()
        )));
    }

    Session::builder()
        .map_err(|e| OcrError::ModelLoad(format!("Failed to create session builder: {}", e)))?
        .with_intra_threads(num_threads)
        .map_err(|e| OcrError::ModelLoad(format!("Failed to set threads: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| {
            OcrError::ModelLoad(format!("Failed to load {}: {}", model_path.display(), e))
        })
}
