//! Text recognition with the PP-OCR CTC recognizer.
//!
//! The recognizer reads one cropped text line and outputs per-timestep class
//! probabilities, decoded greedily against the character dictionary.

use std::path::Path;

use image::RgbImage;
use ndarray::{Array4, ArrayViewD};
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;

use super::config::OcrConfig;
use super::detector::build_session;
use super::preprocess::recognition_input;
use super::types::{OcrError, OcrResult};

/// Text and confidence for one crop
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean probability of the decoded characters; 0.0 for empty text
    pub confidence: f32,
}

/// CTC label set: blank at index 0, dictionary entries, then a space class
#[derive(Debug, Clone)]
pub struct CharacterSet {
    labels: Vec<String>,
}

impl CharacterSet {
    /// Parse a dictionary file with one symbol per line.
    ///
    /// Every line is a class, blank ones included, so label indices match
    /// the model's output layer.
    pub fn parse(content: &str) -> OcrResult<Self> {
        let mut labels = vec![String::new()];
        labels.extend(
            content
                .lines()
                .map(|line| line.trim_end_matches('\r').to_string()),
        );

        if labels.len() == 1 {
            return Err(OcrError::Dictionary("Dictionary is empty".to_string()));
        }

        labels.push(" ".to_string());
        Ok(Self { labels })
    }

    /// Number of classes including blank and space
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.len() <= 1
    }

    /// Greedy CTC decoding of a `[T, C]` (or `[1, T, C]`) probability tensor
    pub fn decode(&self, output: &ArrayViewD<f32>) -> OcrResult<Recognition> {
        let shape = output.shape();
        let (steps, classes) = match shape.len() {
            2 => (shape[0], shape[1]),
            3 => (shape[1], shape[2]),
            _ => {
                return Err(OcrError::Inference(format!(
                    "Unexpected recognition output shape: {:?}",
                    shape
                )));
            }
        };

        let mut text = String::new();
        let mut probs = Vec::new();
        let mut previous = 0usize;

        for t in 0..steps {
            let mut best_idx = 0;
            let mut best_prob = f32::MIN;
            for c in 0..classes {
                let prob = if shape.len() == 3 { output[[0, t, c]] } else { output[[t, c]] };
                if prob > best_prob {
                    best_prob = prob;
                    best_idx = c;
                }
            }

            if best_idx != 0 && best_idx != previous {
                if let Some(label) = self.labels.get(best_idx) {
                    text.push_str(label);
                    probs.push(best_prob);
                }
            }
            previous = best_idx;
        }

        let confidence = if probs.is_empty() {
            0.0
        } else {
            probs.iter().sum::<f32>() / probs.len() as f32
        };

        Ok(Recognition { text, confidence })
    }
}

/// Text recognizer backed by an ONNX Runtime session
pub struct TextRecognizer {
    session: Mutex<Session>,
    charset: CharacterSet,
    reverse_rtl: bool,
}

impl TextRecognizer {
    pub fn load(model_path: &Path, dict_path: &Path, config: &OcrConfig) -> OcrResult<Self> {
        let dict = std::fs::read_to_string(dict_path).map_err(|e| {
            OcrError::Dictionary(format!("Failed to read {}: {}", dict_path.display(), e))
        })?;
        let charset = CharacterSet::parse(&dict)?;
        let session = build_session(model_path, config.num_threads)?;

        tracing::debug!(classes = charset.len(), "Loaded recognition dictionary");

        Ok(Self {
            session: Mutex::new(session),
            charset,
            reverse_rtl: config.reverse_rtl,
        })
    }

    pub fn recognize(&self, crop: &RgbImage) -> OcrResult<Recognition> {
        let input = recognition_input(crop)?;
        let mut recognition = self.run_inference(&input)?;
        if self.reverse_rtl {
            recognition.text = reverse_rtl_segments(&recognition.text);
        }
        Ok(recognition)
    }

    fn run_inference(&self, input: &Array4<f32>) -> OcrResult<Recognition> {
        let mut session = self.session.lock();

        let input_tensor = TensorRef::from_array_view(input)
            .map_err(|e| OcrError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs!["x" => input_tensor])
            .map_err(|e| OcrError::Inference(format!("Recognition failed: {}", e)))?;

        let (_, output_tensor) = outputs
            .iter()
            .next()
            .ok_or_else(|| OcrError::Inference("No output tensor found".to_string()))?;

        let output = output_tensor
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::Inference(format!("Failed to extract output: {}", e)))?;

        self.charset.decode(&output)
    }
}

/// Restore logical order for right-to-left script.
///
/// The recognizer reads pixels left to right, so Arabic comes out reversed.
/// Runs of Latin letters, digits, and common symbols keep their internal
/// order while the sequence of runs is reversed.
pub fn reverse_rtl_segments(text: &str) -> String {
    fn keeps_order(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, ' ' | ':' | '*' | '.' | '/' | '%' | '+' | '-')
    }

    let mut segments: Vec<String> = Vec::new();
    let mut run = String::new();
    for c in text.chars() {
        if keeps_order(c) {
            run.push(c);
        } else {
            if !run.is_empty() {
                segments.push(std::mem::take(&mut run));
            }
            segments.push(c.to_string());
        }
    }
    if !run.is_empty() {
        segments.push(run);
    }

    segments.into_iter().rev().collect()
}
