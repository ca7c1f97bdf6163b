//! Google Cloud Vision provider using `images:annotate`.
//!
//! Authenticates with an API key; one request asks for labels, landmarks,
//! faces, text and localized objects.

use super::{Analysis, ProviderKind, VisionProvider};
use crate::error::ProviderError;
use crate::http;
use crate::upload::ImageInput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const FEATURES: [&str; 5] = [
    "LABEL_DETECTION",
    "LANDMARK_DETECTION",
    "FACE_DETECTION",
    "TEXT_DETECTION",
    "OBJECT_LOCALIZATION",
];

/// Google Cloud Vision provider.
pub struct GoogleVisionProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl GoogleVisionProvider {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/images:annotate", endpoint.trim_end_matches('/')),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Serialize)]
struct AnnotateImageRequest {
    image: RequestImage,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct RequestImage {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    feature_type: &'static str,
}

// --- Response types ---

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

/// Annotations for a single image. Google omits empty arrays entirely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default)]
    pub label_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub landmark_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub face_annotations: Vec<FaceAnnotation>,
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub localized_object_annotations: Vec<LocalizedObjectAnnotation>,
    pub error: Option<Status>,
}

/// Label, landmark or text annotation. Text annotations carry no score.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f32,
}

/// A detected face with expression likelihoods.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnnotation {
    #[serde(default)]
    pub detection_confidence: f32,
    #[serde(default)]
    pub joy_likelihood: Likelihood,
    #[serde(default)]
    pub sorrow_likelihood: Likelihood,
    #[serde(default)]
    pub anger_likelihood: Likelihood,
    #[serde(default)]
    pub surprise_likelihood: Likelihood,
    #[serde(default)]
    pub headwear_likelihood: Likelihood,
}

impl FaceAnnotation {
    /// Expressions rated likely or very likely, in a fixed order.
    pub fn likely_expressions(&self) -> Vec<&'static str> {
        [
            (self.joy_likelihood, "joy"),
            (self.sorrow_likelihood, "sorrow"),
            (self.anger_likelihood, "anger"),
            (self.surprise_likelihood, "surprise"),
            (self.headwear_likelihood, "headwear"),
        ]
        .into_iter()
        .filter(|(likelihood, _)| likelihood.is_likely())
        .map(|(_, name)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    pub fn is_likely(self) -> bool {
        matches!(self, Likelihood::Likely | Likelihood::VeryLikely)
    }
}

/// A localized object; `name` is the object label.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedObjectAnnotation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f32,
}

/// Per-image error status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
impl VisionProvider for GoogleVisionProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn analyze(&self, image: &ImageInput) -> Result<Analysis, ProviderError> {
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: RequestImage {
                    content: image.to_base64(),
                },
                features: FEATURES
                    .iter()
                    .map(|&feature_type| Feature { feature_type })
                    .collect(),
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| http::send_error("Google Vision", e))?;

        let annotate: AnnotateResponse = http::read_json("Google Vision", resp).await?;
        let result = annotate.responses.into_iter().next().ok_or_else(|| {
            ProviderError::http("Google Vision returned no responses for the image")
        })?;

        if let Some(status) = &result.error {
            return Err(ProviderError::Http {
                message: format!("Google Vision error {}: {}", status.code, status.message),
                status_code: None,
            });
        }

        tracing::debug!(
            hash = image.short_hash(),
            labels = result.label_annotations.len(),
            faces = result.face_annotations.len(),
            objects = result.localized_object_annotations.len(),
            "Google Vision annotations received"
        );
        Ok(Analysis::Google(result))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
