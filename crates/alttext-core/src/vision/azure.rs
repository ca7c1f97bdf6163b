//! Azure Computer Vision provider using the v3.2 analyze endpoint.
//!
//! The image is posted as a raw octet stream, not base64.

use super::{Analysis, ProviderKind, VisionProvider};
use crate::error::ProviderError;
use crate::http;
use crate::upload::ImageInput;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Azure Computer Vision provider.
pub struct AzureVisionProvider {
    url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl AzureVisionProvider {
    pub fn new(endpoint: &str, api_key: &str, visual_features: &[String], timeout: Duration) -> Self {
        Self {
            url: format!(
                "{}/vision/v3.2/analyze?visualFeatures={}",
                endpoint.trim_end_matches('/'),
                visual_features.join(",")
            ),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

// --- Response types ---

/// Analyze response. Sections not requested are absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    #[serde(default)]
    pub categories: Vec<Category>,
    pub description: Option<ImageDescription>,
    pub color: Option<ColorInfo>,
    #[serde(default)]
    pub tags: Vec<ImageTag>,
    #[serde(default)]
    pub faces: Vec<FaceDescription>,
    #[serde(default)]
    pub brands: Vec<Brand>,
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageDescription {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub captions: Vec<Caption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Caption {
    pub text: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfo {
    pub dominant_color_foreground: Option<String>,
    pub dominant_color_background: Option<String>,
    #[serde(default)]
    pub dominant_colors: Vec<String>,
    pub accent_color: Option<String>,
    #[serde(default, rename = "isBWImg")]
    pub is_bw_img: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageTag {
    pub name: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaceDescription {
    pub age: Option<u32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Brand {
    pub name: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectedObject {
    pub object: String,
    #[serde(default)]
    pub confidence: f32,
}

#[async_trait]
impl VisionProvider for AzureVisionProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    async fn analyze(&self, image: &ImageInput) -> Result<Analysis, ProviderError> {
        let resp = self
            .client
            .post(&self.url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(image.bytes.clone())
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| http::send_error("Azure Computer Vision", e))?;

        let analysis: ImageAnalysis = http::read_json("Azure Computer Vision", resp).await?;
        tracing::debug!(
            hash = image.short_hash(),
            categories = analysis.categories.len(),
            tags = analysis.tags.len(),
            "Azure analysis received"
        );
        Ok(Analysis::Azure(analysis))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_includes_features() {
        let provider = AzureVisionProvider::new(
            "https://example.cognitiveservices.azure.com/",
            "key",
            &["Categories".to_string(), "Color".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(
            provider.url,
            "https://example.cognitiveservices.azure.com/vision/v3.2/analyze?visualFeatures=Categories,Color"
        );
    }

    #[test]
    fn test_parse_response() {
        let json = r##"{
            "categories": [{"name": "animal_dog", "score": 0.99}],
            "description": {
                "tags": ["dog", "grass", "outdoor"],
                "captions": [{"text": "a dog lying on the grass", "confidence": 0.87}]
            },
            "color": {
                "dominantColorForeground": "Green",
                "dominantColorBackground": "Green",
                "dominantColors": ["Green"],
                "accentColor": "4C7A2B",
                "isBWImg": false
            },
            "tags": [{"name": "dog", "confidence": 0.99}],
            "faces": [],
            "brands": [],
            "objects": [{"rectangle": {"x": 1, "y": 2, "w": 3, "h": 4}, "object": "dog", "confidence": 0.9}],
            "requestId": "abc",
            "metadata": {"height": 600, "width": 800, "format": "Jpeg"}
        }"##;
        let analysis: ImageAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.categories[0].name, "animal_dog");
        let description = analysis.description.unwrap();
        assert_eq!(description.captions[0].text, "a dog lying on the grass");
        assert_eq!(description.tags.len(), 3);
        let color = analysis.color.unwrap();
        assert_eq!(color.dominant_color_foreground.as_deref(), Some("Green"));
        assert!(!color.is_bw_img);
        assert_eq!(analysis.objects[0].object, "dog");
    }

    #[test]
    fn test_parse_minimal_response() {
        let analysis: ImageAnalysis = serde_json::from_str(r#"{"requestId": "x"}"#).unwrap();
        assert!(analysis.categories.is_empty());
        assert!(analysis.description.is_none());
        assert!(analysis.color.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_keeps_status() {
        let server = crate::http::stub::StubServer::start(vec![(
            401,
            r#"{"error": {"code": "401", "message": "Access denied due to invalid subscription key."}}"#,
        )])
        .await;
        let provider =
            AzureVisionProvider::new(&server.base_url, "bad", &[], Duration::from_secs(5));

        let err = provider
            .analyze(&crate::generator::tests::test_image())
            .await
            .unwrap_err();
        match err {
            ProviderError::Http {
                message,
                status_code,
            } => {
                assert_eq!(status_code, Some(401));
                assert!(message.contains("invalid subscription key"));
            }
            other => panic!("Expected HTTP error, got {other:?}"),
        }
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_analyze_parses_success() {
        let server = crate::http::stub::StubServer::start(vec![(
            200,
            r#"{"categories": [{"name": "animal_dog", "score": 0.9}], "requestId": "x"}"#,
        )])
        .await;
        let provider = AzureVisionProvider::new(
            &server.base_url,
            "key",
            &["Categories".to_string()],
            Duration::from_secs(5),
        );

        match provider.analyze(&crate::generator::tests::test_image()).await.unwrap() {
            Analysis::Azure(analysis) => assert_eq!(analysis.categories[0].name, "animal_dog"),
            other => panic!("Expected Azure analysis, got {other:?}"),
        }
    }
}
