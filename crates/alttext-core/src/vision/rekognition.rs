//! Amazon Rekognition provider using the DetectLabels JSON API.
//!
//! Requests are signed with SigV4 by hand rather than through the AWS SDK;
//! DetectLabels is a single POST with a small JSON body.

use super::sigv4::{self, Credentials, SignableRequest};
use super::{Analysis, ProviderKind, VisionProvider};
use crate::config::RekognitionConfig;
use crate::error::ProviderError;
use crate::http;
use crate::upload::ImageInput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TARGET: &str = "RekognitionService.DetectLabels";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Rekognition provider.
pub struct RekognitionProvider {
    credentials: Credentials,
    region: String,
    endpoint: String,
    max_labels: u32,
    client: reqwest::Client,
    timeout: Duration,
}

impl RekognitionProvider {
    pub fn new(credentials: Credentials, config: &RekognitionConfig, timeout: Duration) -> Self {
        Self {
            credentials,
            region: config.region.clone(),
            endpoint: config.endpoint_url(),
            max_labels: config.max_labels,
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsRequest {
    image: RequestImage,
    max_labels: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestImage {
    bytes: String,
}

// --- Response types ---

/// DetectLabels response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectLabelsResponse {
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// A detected label; `confidence` is a percentage (0-100).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub confidence: f32,
}

#[async_trait]
impl VisionProvider for RekognitionProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Rekognition
    }

    async fn analyze(&self, image: &ImageInput) -> Result<Analysis, ProviderError> {
        let body = serde_json::to_vec(&DetectLabelsRequest {
            image: RequestImage {
                bytes: image.to_base64(),
            },
            max_labels: self.max_labels,
        })
        .map_err(|e| ProviderError::http(format!("Failed to encode Rekognition request: {e}")))?;

        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| ProviderError::http(format!("Invalid Rekognition endpoint: {e}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ProviderError::http(format!(
                    "Rekognition endpoint has no host: {}",
                    self.endpoint
                )))
            }
        };

        let signed = sigv4::sign(
            &SignableRequest {
                method: "POST",
                host: &host,
                path: url.path(),
                query: "",
                headers: &[("content-type", CONTENT_TYPE), ("x-amz-target", TARGET)],
                payload: &body,
            },
            &self.credentials,
            &self.region,
            "rekognition",
            chrono::Utc::now(),
        )?;

        let mut request = self
            .client
            .post(url)
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", TARGET)
            .timeout(self.timeout());
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let resp = request
            .body(body)
            .send()
            .await
            .map_err(|e| http::send_error("Rekognition", e))?;

        let labels: DetectLabelsResponse = http::read_json("Rekognition", resp).await?;
        tracing::debug!(
            hash = image.short_hash(),
            "Rekognition returned {} labels",
            labels.labels.len()
        );
        Ok(Analysis::Rekognition(labels))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
