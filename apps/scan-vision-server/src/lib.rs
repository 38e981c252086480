//! Scan Vision Server Library
//!
//! OCR over HTTP for images and PDFs. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `ocr`: PaddleOCR detection and recognition on ONNX Runtime
//! - `pdf`: page rasterization via MuPDF
//! - `aggregate`: per-page regions to API responses
//! - `routes`: axum handlers and the router

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod upload;

#[cfg(test)]
mod testing;
