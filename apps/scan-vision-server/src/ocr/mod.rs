//! OCR Module
//!
//! Text detection and recognition with PaddleOCR models exported to ONNX.
//!
//! The pipeline for one image:
//! 1. Detection: DB model produces a text probability map, postprocessed
//!    into boxes in reading order
//! 2. Recognition: each box is cropped and decoded with CTC against the
//!    model's character dictionary
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scan_vision_server::ocr::OcrService;
//!
//! let service = OcrService::paddle(&config);
//! let regions = service.recognize(image).await?;
//! for region in regions {
//!     println!("{} ({:.2})", region.text, region.confidence);
//! }
//! ```

mod config;
mod detector;
mod engine;
mod postprocess;
mod preprocess;
mod provider;
mod recognizer;
mod service;
mod types;

pub use config::OcrConfig;
pub use engine::PaddleOcrEngine;
pub use provider::OcrBackend;
pub use recognizer::reverse_rtl_segments;
pub use service::OcrService;
pub use types::{OcrError, OcrResult, RecognizedRegion};
