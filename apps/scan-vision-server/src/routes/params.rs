//! Query parameter validation
//!
//! Parameters arrive as raw strings so that malformed and out-of-range values
//! produce the same `422` response naming the parameter.

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_DPI: u32 = 300;
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;

/// Query string of the image endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub min_conf: Option<String>,
}

/// Query string of the PDF endpoints
#[derive(Debug, Default, Deserialize)]
pub struct PdfQuery {
    pub min_conf: Option<String>,
    pub dpi: Option<String>,
    pub page_markers: Option<String>,
}

/// Validated PDF options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    pub min_conf: f32,
    pub dpi: u32,
    pub page_markers: bool,
}

impl ImageQuery {
    pub fn min_conf(&self) -> Result<f32, AppError> {
        parse_min_conf(self.min_conf.as_deref())
    }
}

impl PdfQuery {
    pub fn validate(&self) -> Result<PdfOptions, AppError> {
        Ok(PdfOptions {
            min_conf: parse_min_conf(self.min_conf.as_deref())?,
            dpi: parse_dpi(self.dpi.as_deref())?,
            page_markers: parse_flag("page_markers", self.page_markers.as_deref())?,
        })
    }
}

/// Confidence threshold in [0, 1], default 0
pub fn parse_min_conf(raw: Option<&str>) -> Result<f32, AppError> {
    let Some(raw) = raw else {
        return Ok(0.0);
    };

    match raw.trim().parse::<f32>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err(AppError::InvalidParameter(format!(
            "min_conf must be a number between 0 and 1, got {:?}",
            raw
        ))),
    }
}

/// Rasterization DPI in [72, 600], default 300
pub fn parse_dpi(raw: Option<&str>) -> Result<u32, AppError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_DPI);
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if (MIN_DPI..=MAX_DPI).contains(&value) => Ok(value),
        _ => Err(AppError::InvalidParameter(format!(
            "dpi must be an integer between {} and {}, got {:?}",
            MIN_DPI, MAX_DPI, raw
        ))),
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool, AppError> {
    match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        None | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") | Some("") => Ok(true),
        Some(other) => Err(AppError::InvalidParameter(format!(
            "{} must be true or false, got {:?}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_conf() {
        assert_eq!(parse_min_conf(None).unwrap(), 0.0);
        assert_eq!(parse_min_conf(Some("0.75")).unwrap(), 0.75);
        assert_eq!(parse_min_conf(Some("1")).unwrap(), 1.0);
        assert!(parse_min_conf(Some("1.5")).is_err());
        assert!(parse_min_conf(Some("-0.1")).is_err());
        assert!(parse_min_conf(Some("NaN")).is_err());
        assert!(parse_min_conf(Some("high")).is_err());
    }

    #[test]
    fn test_dpi() {
        assert_eq!(parse_dpi(None).unwrap(), 300);
        assert_eq!(parse_dpi(Some("72")).unwrap(), 72);
        assert_eq!(parse_dpi(Some("600")).unwrap(), 600);
        assert!(parse_dpi(Some("71")).is_err());
        assert!(parse_dpi(Some("601")).is_err());
        assert!(parse_dpi(Some("150.5")).is_err());
    }

    #[test]
    fn test_error_names_parameter() {
        let err = parse_dpi(Some("9000")).unwrap_err();
        assert!(err.to_string().contains("dpi"));
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_pdf_query() {
        let query = PdfQuery {
            min_conf: Some("0.5".into()),
            dpi: None,
            page_markers: Some("true".into()),
        };
        assert_eq!(
            query.validate().unwrap(),
            PdfOptions {
                min_conf: 0.5,
                dpi: 300,
                page_markers: true
            }
        );

        let query = PdfQuery {
            page_markers: Some("maybe".into()),
            ..PdfQuery::default()
        };
        assert!(query.validate().is_err());
    }
}
