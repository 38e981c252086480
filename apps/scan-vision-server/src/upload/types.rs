//! Upload types
//!
//! Defines the uploaded file and the checks applied before it reaches OCR.

use axum::http::StatusCode;
use image::DynamicImage;

/// What the uploaded bytes look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Unknown,
}

impl FileKind {
    /// Detect the kind from the file signature
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(b"%PDF-") {
            FileKind::Pdf
        } else if image::guess_format(data).is_ok() {
            FileKind::Image
        } else {
            FileKind::Unknown
        }
    }

    /// Kind implied by a declared MIME type or a file name
    pub fn from_declared(content_type: Option<&str>, file_name: Option<&str>) -> Self {
        let mime = content_type
            .and_then(|ct| ct.parse::<mime_guess::mime::Mime>().ok())
            .filter(|m| *m != mime_guess::mime::APPLICATION_OCTET_STREAM)
            .or_else(|| file_name.and_then(|name| mime_guess::from_path(name).first()));

        match mime {
            Some(m) if m.type_() == mime_guess::mime::IMAGE => FileKind::Image,
            Some(m) if m.essence_str() == "application/pdf" => FileKind::Pdf,
            _ => FileKind::Unknown,
        }
    }
}

/// A file received in the `file` multipart field
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn sniffed_kind(&self) -> FileKind {
        FileKind::sniff(&self.data)
    }

    pub fn declared_kind(&self) -> FileKind {
        FileKind::from_declared(self.content_type.as_deref(), self.file_name.as_deref())
    }

    /// Decode the upload as an RGB image
    pub fn decode_image(&self) -> Result<DynamicImage, UploadError> {
        if self.sniffed_kind() != FileKind::Image {
            return Err(UploadError::InvalidImage);
        }
        let decoded = image::load_from_memory(&self.data).map_err(|e| {
            tracing::debug!("Image decode failed: {}", e);
            UploadError::InvalidImage
        })?;
        Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
    }

    /// Check that the upload is a PDF before handing it to the rasterizer.
    ///
    /// A PDF signature wins; otherwise a declared PDF type lets MuPDF decide.
    pub fn ensure_pdf(&self) -> Result<(), UploadError> {
        match (self.sniffed_kind(), self.declared_kind()) {
            (FileKind::Pdf, _) => Ok(()),
            (FileKind::Unknown, FileKind::Pdf) => Ok(()),
            _ => Err(UploadError::NotPdf),
        }
    }
}

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file provided. Use field name 'file'")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Failed to read upload: {message}")]
    Malformed { status: StatusCode, message: String },

    #[error("Uploaded file exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("Invalid image file")]
    InvalidImage,

    #[error("Invalid PDF file: expected a PDF document")]
    NotPdf,
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Malformed { status, .. } if status.is_client_error() => *status,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::png_bytes;

    fn upload(data: Vec<u8>, content_type: Option<&str>, file_name: Option<&str>) -> UploadedFile {
        UploadedFile {
            file_name: file_name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            data,
        }
    }

    #[test]
    fn test_sniff() {
        assert_eq!(FileKind::sniff(b"%PDF-1.7\n..."), FileKind::Pdf);
        assert_eq!(FileKind::sniff(&png_bytes(4, 4)), FileKind::Image);
        assert_eq!(FileKind::sniff(b"hello world"), FileKind::Unknown);
    }

    #[test]
    fn test_declared_kind() {
        assert_eq!(FileKind::from_declared(Some("image/jpeg"), None), FileKind::Image);
        assert_eq!(
            FileKind::from_declared(Some("application/pdf"), Some("x.bin")),
            FileKind::Pdf
        );
        // Generic content type falls back to the file name
        assert_eq!(
            FileKind::from_declared(Some("application/octet-stream"), Some("scan.pdf")),
            FileKind::Pdf
        );
        assert_eq!(FileKind::from_declared(None, Some("notes.txt")), FileKind::Unknown);
    }

    #[test]
    fn test_decode_image() {
        let img = upload(png_bytes(8, 6), Some("image/png"), Some("a.png"))
            .decode_image()
            .unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
    }

    #[test]
    fn test_decode_rejects_non_image() {
        let result =
            upload(b"not an image".to_vec(), Some("image/png"), Some("a.png")).decode_image();
        assert!(matches!(result, Err(UploadError::InvalidImage)));

        // Valid signature, truncated body
        let mut truncated = png_bytes(8, 8);
        truncated.truncate(20);
        let result = upload(truncated, None, None).decode_image();
        assert!(matches!(result, Err(UploadError::InvalidImage)));
    }

    #[test]
    fn test_ensure_pdf() {
        assert!(upload(b"%PDF-1.4".to_vec(), None, None).ensure_pdf().is_ok());
        assert!(upload(b"garbage".to_vec(), Some("application/pdf"), None)
            .ensure_pdf()
            .is_ok());
        assert!(matches!(
            upload(png_bytes(2, 2), Some("application/pdf"), None).ensure_pdf(),
            Err(UploadError::NotPdf)
        ));
        assert!(matches!(
            upload(b"garbage".to_vec(), Some("text/plain"), None).ensure_pdf(),
            Err(UploadError::NotPdf)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            UploadError::TooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(UploadError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UploadError::Malformed {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "io".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
