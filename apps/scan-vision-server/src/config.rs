//! Configuration management for Scan Vision Server

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration errors are fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub models: ModelConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Shared key expected in `X-API-Key`. `None` disables the check.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Detection model name (reported in responses)
    pub det_model: String,
    /// Recognition model name (reported in responses)
    pub rec_model: String,
    pub det_model_path: PathBuf,
    pub rec_model_path: PathBuf,
    pub dict_path: PathBuf,
    /// ONNX Runtime intra-op threads per session
    pub num_threads: usize,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub max_pdf_pages: usize,
    pub ocr_timeout: Duration,
}

pub const DEFAULT_PORT: u16 = 7860;
pub const DEFAULT_DET_MODEL: &str = "PP-OCRv5_server_det";
pub const DEFAULT_REC_MODEL: &str = "arabic_PP-OCRv5_mobile_rec";
const DEFAULT_MODEL_DIR: &str = "./models";
const DEFAULT_NUM_THREADS: usize = 4;
const DEFAULT_MAX_UPLOAD_MB: usize = 50;
const DEFAULT_MAX_PDF_PAGES: usize = 100;
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;

impl ModelConfig {
    /// Model files named after the models inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>, det_model: &str, rec_model: &str) -> Self {
        let dir = dir.into();
        Self {
            det_model: det_model.to_string(),
            rec_model: rec_model.to_string(),
            det_model_path: dir.join(format!("{}.onnx", det_model)),
            rec_model_path: dir.join(format!("{}.onnx", rec_model)),
            dict_path: dir.join(format!("{}_dict.txt", rec_model)),
            num_threads: DEFAULT_NUM_THREADS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            auth: AuthConfig::default(),
            models: ModelConfig::in_dir(DEFAULT_MODEL_DIR, DEFAULT_DET_MODEL, DEFAULT_REC_MODEL),
            limits: LimitsConfig {
                max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
                max_pdf_pages: DEFAULT_MAX_PDF_PAGES,
                ocr_timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from a variable lookup. Blank values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let det_model = var("PADDLE_DET_MODEL").unwrap_or_else(|| DEFAULT_DET_MODEL.to_string());
        let rec_model = var("PADDLE_REC_MODEL").unwrap_or_else(|| DEFAULT_REC_MODEL.to_string());
        let model_dir = var("OCR_MODEL_DIR").unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string());

        let mut models = ModelConfig::in_dir(model_dir, &det_model, &rec_model);
        if let Some(path) = var("OCR_DET_MODEL_PATH") {
            models.det_model_path = path.into();
        }
        if let Some(path) = var("OCR_REC_MODEL_PATH") {
            models.rec_model_path = path.into();
        }
        if let Some(path) = var("OCR_DICT_PATH") {
            models.dict_path = path.into();
        }
        models.num_threads = positive(
            "OCR_NUM_THREADS",
            var("OCR_NUM_THREADS"),
            DEFAULT_NUM_THREADS,
        )?;

        let max_upload_mb = positive("MAX_UPLOAD_MB", var("MAX_UPLOAD_MB"), DEFAULT_MAX_UPLOAD_MB)?;
        let timeout_secs = positive(
            "OCR_TIMEOUT_SECS",
            var("OCR_TIMEOUT_SECS"),
            DEFAULT_OCR_TIMEOUT_SECS,
        )?;

        Ok(Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse("PORT", var("PORT"), DEFAULT_PORT)?,
            },
            auth: AuthConfig {
                api_key: var("API_KEY"),
            },
            models,
            limits: LimitsConfig {
                max_upload_bytes: max_upload_mb * 1024 * 1024,
                max_pdf_pages: positive(
                    "MAX_PDF_PAGES",
                    var("MAX_PDF_PAGES"),
                    DEFAULT_MAX_PDF_PAGES,
                )?,
                ocr_timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: Display,
{
    let value = parse(key, raw.clone(), default)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            value: raw.unwrap_or_default(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.server.port, 7860);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.auth.api_key.is_none());
        assert_eq!(config.models.det_model, "PP-OCRv5_server_det");
        assert_eq!(config.models.rec_model, "arabic_PP-OCRv5_mobile_rec");
        assert_eq!(
            config.models.rec_model_path,
            PathBuf::from("./models/arabic_PP-OCRv5_mobile_rec.onnx")
        );
        assert_eq!(
            config.models.dict_path,
            PathBuf::from("./models/arabic_PP-OCRv5_mobile_rec_dict.txt")
        );
        assert_eq!(config.limits.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.limits.max_pdf_pages, 100);
    }

    #[test]
    fn test_port_and_api_key() {
        let config = from_map(&[("PORT", "8080"), ("API_KEY", "secret")]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_api_key_disables_auth() {
        let config = from_map(&[("API_KEY", "   ")]).unwrap();
        assert!(config.auth.api_key.is_none());
    }

    #[test]
    fn test_model_dir_and_overrides() {
        let config = from_map(&[
            ("OCR_MODEL_DIR", "/opt/models"),
            ("PADDLE_DET_MODEL", "PP-OCRv5_mobile_det"),
            ("OCR_DICT_PATH", "/etc/ocr/arabic.txt"),
        ])
        .unwrap();
        assert_eq!(
            config.models.det_model_path,
            PathBuf::from("/opt/models/PP-OCRv5_mobile_det.onnx")
        );
        assert_eq!(config.models.dict_path, PathBuf::from("/etc/ocr/arabic.txt"));
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = from_map(&[("PORT", "not-a-port")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(from_map(&[("MAX_PDF_PAGES", "0")]).is_err());
        assert!(from_map(&[("OCR_NUM_THREADS", "0")]).is_err());
    }
}
