//! Computer-vision providers.
//!
//! Each provider sends the uploaded image to one vendor API and returns the
//! vendor's typed response. Turning that response into a prompt is the job
//! of [`crate::prompt`].

pub mod azure;
pub mod google;
pub mod rekognition;
pub mod sigv4;

use crate::config::{resolve_env_var, VisionConfig};
use crate::error::{ConfigError, ProviderError};
use crate::upload::ImageInput;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// The vision vendors, in the order their results are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Rekognition,
    Google,
    Azure,
}

impl ProviderKind {
    /// All providers in reporting order.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Rekognition,
        ProviderKind::Google,
        ProviderKind::Azure,
    ];

    /// Name shown to users next to the generated text.
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Rekognition => "Amazon Rekognition",
            ProviderKind::Google => "Google CV",
            ProviderKind::Azure => "Azure Computer Vision",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A vendor response, kept in its typed form.
#[derive(Debug, Clone)]
pub enum Analysis {
    Rekognition(rekognition::DetectLabelsResponse),
    Google(google::AnnotateImageResponse),
    Azure(azure::ImageAnalysis),
}

impl Analysis {
    /// Which provider produced this analysis.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Analysis::Rekognition(_) => ProviderKind::Rekognition,
            Analysis::Google(_) => ProviderKind::Google,
            Analysis::Azure(_) => ProviderKind::Azure,
        }
    }
}

/// Trait that all vision providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn VisionProvider>` for dynamic dispatch).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Which vendor this is.
    fn kind(&self) -> ProviderKind;

    /// Send the image to the vendor and return its analysis.
    async fn analyze(&self, image: &ImageInput) -> Result<Analysis, ProviderError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Factory that builds the enabled vision providers from config.
pub struct VisionProviderFactory;

impl VisionProviderFactory {
    /// Create every enabled provider, in reporting order.
    ///
    /// An enabled provider whose credentials don't resolve is a config error
    /// rather than a silent skip.
    pub fn create_all(
        config: &VisionConfig,
        timeout: Duration,
    ) -> Result<Vec<Box<dyn VisionProvider>>, ConfigError> {
        let mut providers: Vec<Box<dyn VisionProvider>> = Vec::new();

        for kind in ProviderKind::ALL {
            match kind {
                ProviderKind::Rekognition if config.rekognition.enabled => {
                    let cfg = &config.rekognition;
                    let credentials = sigv4::Credentials {
                        access_key_id: required(&cfg.access_key_id, kind, "AWS_ACCESS_KEY_ID")?,
                        secret_access_key: required(
                            &cfg.secret_access_key,
                            kind,
                            "AWS_SECRET_ACCESS_KEY",
                        )?,
                        session_token: resolve_env_var(&cfg.session_token),
                    };
                    providers.push(Box::new(rekognition::RekognitionProvider::new(
                        credentials,
                        cfg,
                        timeout,
                    )));
                }
                ProviderKind::Google if config.google.enabled => {
                    let cfg = &config.google;
                    let api_key = required(&cfg.api_key, kind, "GOOGLE_VISION_API_KEY")?;
                    providers.push(Box::new(google::GoogleVisionProvider::new(
                        &cfg.endpoint,
                        &api_key,
                        timeout,
                    )));
                }
                ProviderKind::Azure if config.azure.enabled => {
                    let cfg = &config.azure;
                    let endpoint = required(&cfg.endpoint, kind, "AZURE_ENDPOINT")?;
                    let api_key = required(&cfg.api_key, kind, "AZURE_COMPUTER_VISION_KEY")?;
                    providers.push(Box::new(azure::AzureVisionProvider::new(
                        &endpoint,
                        &api_key,
                        &cfg.visual_features,
                        timeout,
                    )));
                }
                _ => tracing::debug!("{kind} disabled in config"),
            }
        }

        Ok(providers)
    }
}

fn required(value: &str, kind: ProviderKind, env_var: &str) -> Result<String, ConfigError> {
    resolve_env_var(value).ok_or_else(|| ConfigError::MissingCredentials {
        provider: kind.display_name().to_string(),
        hint: format!("set the {env_var} env var or put the value in the config file"),
    })
}
