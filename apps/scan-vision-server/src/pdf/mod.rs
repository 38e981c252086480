//! PDF Module
//!
//! Rasterizes PDF pages to images for OCR.

mod rasterizer;

pub use rasterizer::{
    page_scale, MupdfRasterizer, PageRasterizer, PageSender, PageStream, RasterError,
};
