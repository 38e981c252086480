//! OCR pipeline configuration.

use std::path::PathBuf;

use crate::config::ModelConfig;

/// Configuration for the detection + recognition pipeline.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub det_model_path: PathBuf,
    pub rec_model_path: PathBuf,
    pub dict_path: PathBuf,

    /// Number of inference threads per session (default: 4)
    pub num_threads: usize,

    /// Longest side of the detection input (default: 960)
    pub det_limit_side_len: u32,

    /// Probability map binarization threshold (default: 0.3)
    pub det_threshold: f32,

    /// Minimum mean probability to keep a box (default: 0.6)
    pub box_threshold: f32,

    /// Box expansion ratio (default: 1.5)
    pub unclip_ratio: f32,

    /// Maximum number of text box candidates (default: 1000)
    pub max_candidates: usize,

    /// Restore logical order of right-to-left output (default: true for Arabic models)
    pub reverse_rtl: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            det_model_path: PathBuf::from("det.onnx"),
            rec_model_path: PathBuf::from("rec.onnx"),
            dict_path: PathBuf::from("dict.txt"),
            num_threads: 4,
            det_limit_side_len: 960,
            det_threshold: 0.3,
            box_threshold: 0.6,
            unclip_ratio: 1.5,
            max_candidates: 1000,
            reverse_rtl: false,
        }
    }
}

impl OcrConfig {
    pub fn from_models(models: &ModelConfig) -> Self {
        Self {
            det_model_path: models.det_model_path.clone(),
            rec_model_path: models.rec_model_path.clone(),
            dict_path: models.dict_path.clone(),
            num_threads: models.num_threads,
            reverse_rtl: models.rec_model.to_lowercase().contains("arabic"),
            ..Self::default()
        }
    }
}
