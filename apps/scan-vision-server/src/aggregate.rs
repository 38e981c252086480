//! Response aggregation
//!
//! Turns per-page recognized regions into the API response: confidence
//! filtering, global box numbering, and the joined plain text.

use serde::Serialize;

use crate::ocr::RecognizedRegion;

/// One recognized text box in the response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextItem {
    /// 1-based, unique across all pages of the request
    pub box_id: usize,
    pub text: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in pixels of the (rasterized) page image
    pub bbox: [u32; 4],
    /// 1-based page number, present for PDF uploads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub polygon: [[f32; 2]; 4],
}

/// OCR response body
#[derive(Debug, Clone, Serialize)]
pub struct OcrResponse {
    pub pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    pub det_model: String,
    pub rec_model: String,
    pub items: Vec<TextItem>,
    pub text: String,
    pub total_boxes: usize,
}

/// Accumulates pages of regions in order
#[derive(Debug)]
pub struct Aggregator {
    min_conf: f32,
    dpi: Option<u32>,
    page_markers: bool,
    pages: usize,
    items: Vec<TextItem>,
    lines: Vec<String>,
}

impl Aggregator {
    /// Single image upload
    pub fn for_image(min_conf: f32) -> Self {
        Self {
            min_conf,
            dpi: None,
            page_markers: false,
            pages: 0,
            items: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// PDF upload rendered at `dpi`; items carry their page number
    pub fn for_pdf(min_conf: f32, dpi: u32, page_markers: bool) -> Self {
        Self {
            dpi: Some(dpi),
            page_markers,
            ..Self::for_image(min_conf)
        }
    }

    /// Add the next page's regions, in reading order
    pub fn push_page(&mut self, regions: Vec<RecognizedRegion>) {
        self.pages += 1;
        let page = self.dpi.map(|_| self.pages);

        if self.page_markers {
            self.lines.push(format!("--- page {} ---", self.pages));
        }

        for region in regions {
            if region.confidence < self.min_conf {
                continue;
            }

            if !region.text.is_empty() {
                self.lines.push(region.text.clone());
            }

            self.items.push(TextItem {
                box_id: self.items.len() + 1,
                text: region.text,
                confidence: region.confidence,
                bbox: region.bbox,
                page,
                polygon: region.polygon,
            });
        }
    }

    pub fn finish(self, det_model: &str, rec_model: &str) -> OcrResponse {
        OcrResponse {
            pages: self.pages,
            dpi: self.dpi,
            det_model: det_model.to_string(),
            rec_model: rec_model.to_string(),
            total_boxes: self.items.len(),
            items: self.items,
            text: self.lines.join("\n"),
        }
    }
}
