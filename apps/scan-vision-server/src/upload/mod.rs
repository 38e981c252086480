//! Upload Module
//!
//! Reads the `file` field from a multipart request and validates it.

mod types;

pub use types::{FileKind, UploadError, UploadedFile};

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;

/// Multipart field carrying the document
pub const FILE_FIELD: &str = "file";

/// Read the `file` field, enforcing the size limit.
///
/// Other fields are skipped.
pub async fn read_file(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<UploadedFile, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != FILE_FIELD {
            tracing::debug!("Skipping multipart field '{}'", name);
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;

        tracing::debug!(
            file_name = ?file_name,
            content_type = ?content_type,
            bytes = data.len(),
            "Received upload"
        );

        if data.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        if data.len() > max_bytes {
            return Err(UploadError::TooLarge { limit: max_bytes });
        }

        return Ok(UploadedFile {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    tracing::warn!("No file field found in multipart upload");
    Err(UploadError::MissingFile)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> UploadError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge { limit: max_bytes };
    }
    tracing::warn!("Failed to read multipart upload: {}", err.body_text());
    UploadError::Malformed {
        status,
        message: err.body_text(),
    }
}
