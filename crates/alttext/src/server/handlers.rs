//! Route handlers for the upload page and `POST /api/analyzeImg`.

use alttext_core::{GenerateError, GeneratedAltText, ImageError, ImageInput};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Request body for the analysis endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// `data:image/<type>;base64,<payload>`
    pub image: String,
}

/// Error response rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    /// Unusable request body or image
    BadRequest(String),
    /// Body over the configured limit
    PayloadTooLarge(String),
    /// A provider failed
    Internal(String),
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Timeout { .. } => ApiError::Internal(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `POST /api/analyzeImg`
pub async fn analyze_image(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Vec<GeneratedAltText>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected analyze request: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    let image = ImageInput::from_data_uri(&request.image, state.max_upload_mb).map_err(|e| {
        tracing::warn!("Invalid upload: {e}");
        ApiError::from(e)
    })?;
    let image = state.compressor.compress(image).await?;

    let results = state.generator.generate(&image).await.map_err(|e| {
        tracing::error!("Alt text generation failed: {e}");
        ApiError::from(e)
    })?;

    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use alttext_core::completion::{CompletionRequest, CompletionResponse};
    use alttext_core::config::{CompletionConfig, CompressionConfig};
    use alttext_core::vision::rekognition::{DetectLabelsResponse, Label};
    use alttext_core::vision::Analysis;
    use alttext_core::{
        AltTextGenerator, CompletionProvider, Compressor, GenerateOptions, PromptBuilder,
        ProviderError, ProviderKind, VisionProvider,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use axum::Router;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    struct LabelVision {
        fail: bool,
    }

    #[async_trait]
    impl VisionProvider for LabelVision {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Rekognition
        }

        async fn analyze(&self, _image: &ImageInput) -> Result<Analysis, ProviderError> {
            if self.fail {
                return Err(ProviderError::Http {
                    message: "AccessDenied".to_string(),
                    status_code: Some(403),
                });
            }
            Ok(Analysis::Rekognition(DetectLabelsResponse {
                labels: vec![Label {
                    name: "Dog".to_string(),
                    confidence: 99.0,
                }],
            }))
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    struct FixedCompletion;

    #[async_trait]
    impl CompletionProvider for FixedCompletion {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                text: "This image shows a dog.".to_string(),
                model: "fixed".to_string(),
                tokens_used: None,
                latency_ms: 0,
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    fn test_router(fail: bool, body_limit_bytes: usize) -> Router {
        let generator = AltTextGenerator::new(
            vec![Box::new(LabelVision { fail })],
            Box::new(FixedCompletion),
            PromptBuilder::default(),
            CompletionConfig::default(),
            GenerateOptions {
                retry_attempts: 0,
                ..GenerateOptions::default()
            },
        );
        let compressor = Compressor::new(
            CompressionConfig {
                enabled: false,
                ..CompressionConfig::default()
            },
            1000,
        );
        router(
            AppState {
                generator: Arc::new(generator),
                compressor: Arc::new(compressor),
                max_upload_mb: 5,
            },
            body_limit_bytes,
        )
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/analyzeImg")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_serves_upload_page() {
        let response = test_router(false, 1024 * 1024)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router(false, 1024)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_returns_alt_text_per_provider() {
        let body = serde_json::json!({ "image": PNG_DATA_URI }).to_string();
        let response = test_router(false, 1024 * 1024)
            .oneshot(post_json(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json,
            serde_json::json!([{
                "provider": "Amazon Rekognition",
                "generatedAltText": "This image shows a dog."
            }])
        );
    }

    #[tokio::test]
    async fn test_analyze_rejects_get() {
        let response = test_router(false, 1024)
            .oneshot(Request::get("/api/analyzeImg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_analyze_invalid_data_uri_is_bad_request() {
        let body = serde_json::json!({ "image": "data:text/plain;base64,aGVsbG8=" }).to_string();
        let response = test_router(false, 1024 * 1024)
            .oneshot(post_json(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_malformed_json_is_bad_request() {
        let response = test_router(false, 1024 * 1024)
            .oneshot(post_json("{\"img\": 1}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_provider_failure_is_internal_error() {
        let body = serde_json::json!({ "image": PNG_DATA_URI }).to_string();
        let response = test_router(true, 1024 * 1024)
            .oneshot(post_json(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("Amazon Rekognition"));
        assert!(message.contains("AccessDenied"));
    }

    #[tokio::test]
    async fn test_analyze_oversized_body_is_rejected() {
        let image = format!("data:image/png;base64,{}", "A".repeat(4096));
        let body = serde_json::json!({ "image": image }).to_string();
        let response = test_router(false, 1024)
            .oneshot(post_json(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
