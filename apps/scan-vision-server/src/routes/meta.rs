//! Service metadata and health endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "OCR Scan Vision API";

#[derive(Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    /// Loaded backend name, or `unavailable` until the models load
    pub ocr_backend: &'static str,
    pub det_model: String,
    pub rec_model: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let ocr = state.ocr();
    Json(ServiceInfo {
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
        ocr_backend: ocr.loaded_backend().unwrap_or("unavailable"),
        det_model: ocr.det_model().to_string(),
        rec_model: ocr.rec_model().to_string(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::ocr::{OcrError, OcrService};
    use crate::routes::router;
    use crate::state::AppState;
    use crate::testing::{read_json, test_state, FakeRasterizer, StaticBackend};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state(
            Config::default(),
            Arc::new(StaticBackend::empty()),
            Arc::new(FakeRasterizer::new(1)),
        );

        let response = router(state).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_health_needs_no_api_key() {
        let mut config = Config::default();
        config.auth.api_key = Some("secret".into());
        let state = test_state(
            config,
            Arc::new(StaticBackend::empty()),
            Arc::new(FakeRasterizer::new(1)),
        );

        let response = router(state).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_reports_loaded_backend() {
        let state = test_state(
            Config::default(),
            Arc::new(StaticBackend::empty()),
            Arc::new(FakeRasterizer::new(1)),
        );

        let json = read_json(router(state).oneshot(get("/")).await.unwrap()).await;
        assert_eq!(json["name"], "OCR Scan Vision API");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["ocr_backend"], "static");
        assert_eq!(json["det_model"], "PP-OCRv5_server_det");
        assert_eq!(json["rec_model"], "arabic_PP-OCRv5_mobile_rec");
    }

    #[tokio::test]
    async fn test_root_before_models_load() {
        let config = Config::default();
        let ocr = OcrService::with_loader(&config, || {
            Err(OcrError::ModelLoad("not loaded yet".into()))
        });
        let state = AppState::with_components(config, ocr, Arc::new(FakeRasterizer::new(1)));

        let json = read_json(router(state).oneshot(get("/")).await.unwrap()).await;
        assert_eq!(json["ocr_backend"], "unavailable");
    }
}
