//! API key authentication
//!
//! When an API key is configured, OCR endpoints require it in the
//! `X-API-Key` header. Without a configured key every request is accepted.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that rejects requests without the configured API key
pub struct RequireApiKey;

#[async_trait]
impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config().auth.api_key.as_deref() else {
            return Ok(RequireApiKey);
        };

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        match provided {
            Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => Ok(RequireApiKey),
            Some(_) => {
                warn!(path = %parts.uri.path(), "Rejected request with invalid API key");
                Err(AppError::Unauthorized)
            }
            None => {
                warn!(path = %parts.uri.path(), "Rejected request without API key");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Comparison time depends only on the lengths
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"secret", b"secret"));
        assert!(!keys_match(b"secreT", b"secret"));
        assert!(!keys_match(b"secret1", b"secret"));
        assert!(!keys_match(b"", b"secret"));
    }
}
