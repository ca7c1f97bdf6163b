//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,

    /// Maximum accepted request body in megabytes
    pub body_limit_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            body_limit_mb: 5,
        }
    }
}

/// Resource limits to protect against problematic inputs and slow vendors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum decoded image size in megabytes
    pub max_upload_mb: u64,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Vision API call timeout in milliseconds
    pub vision_timeout_ms: u64,

    /// Completion API call timeout in milliseconds
    pub completion_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 5,
            decode_timeout_ms: 5000,
            vision_timeout_ms: 30_000,
            completion_timeout_ms: 60_000,
        }
    }
}

/// Server-side image compression, mirroring what the upload page does in the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Whether uploads are recompressed before being sent to providers
    pub enabled: bool,

    /// Longest edge in pixels
    pub max_dimension: u32,

    /// Target encoded size in kilobytes
    pub max_size_kb: u64,

    /// JPEG quality levels tried in order until the target size is met
    pub quality_steps: Vec<u8>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_dimension: 1920,
            max_size_kb: 1024,
            quality_steps: vec![90, 80, 70, 60, 50, 40],
        }
    }
}

/// Fan-out behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the per-provider pipelines concurrently
    pub parallel: bool,

    /// Report failing providers inline instead of failing the whole request
    pub partial_results: bool,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            partial_results: false,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Vision provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VisionConfig {
    /// Amazon Rekognition configuration
    pub rekognition: RekognitionConfig,

    /// Google Cloud Vision configuration
    pub google: GoogleConfig,

    /// Azure Computer Vision configuration
    pub azure: AzureConfig,
}

/// Amazon Rekognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RekognitionConfig {
    pub enabled: bool,

    /// AWS region
    pub region: String,

    /// Access key id (supports ${ENV_VAR} syntax)
    pub access_key_id: String,

    /// Secret access key (supports ${ENV_VAR} syntax)
    pub secret_access_key: String,

    /// Session token for temporary credentials (supports ${ENV_VAR} syntax)
    pub session_token: String,

    /// Endpoint override; derived from the region when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Maximum labels requested from DetectLabels
    pub max_labels: u32,

    /// Labels at or below this confidence (0-100) are left out of the prompt
    pub min_confidence: f32,
}

impl Default for RekognitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            region: "us-east-1".to_string(),
            access_key_id: "${AWS_ACCESS_KEY_ID}".to_string(),
            secret_access_key: "${AWS_SECRET_ACCESS_KEY}".to_string(),
            session_token: "${AWS_SESSION_TOKEN}".to_string(),
            endpoint: None,
            max_labels: 10,
            min_confidence: 80.0,
        }
    }
}

impl RekognitionConfig {
    /// Resolve the endpoint URL for the configured region.
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://rekognition.{}.amazonaws.com", self.region))
    }
}

/// Google Cloud Vision configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub enabled: bool,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// API base URL
    pub endpoint: String,

    /// Annotations at or below this score (0-1) are left out of the prompt
    pub min_score: f32,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: "${GOOGLE_VISION_API_KEY}".to_string(),
            endpoint: "https://vision.googleapis.com/v1".to_string(),
            min_score: 0.8,
        }
    }
}

/// Azure Computer Vision configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub enabled: bool,

    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`
    pub endpoint: String,

    /// Subscription key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Visual features requested from the analyze endpoint
    pub visual_features: Vec<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "${AZURE_ENDPOINT}".to_string(),
            api_key: "${AZURE_COMPUTER_VISION_KEY}".to_string(),
            visual_features: [
                "Categories",
                "Description",
                "Color",
                "Tags",
                "Faces",
                "Brands",
                "Objects",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Completion model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Provider identifier ("openai", "openai-chat", "ollama")
    pub provider: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Number of choices requested (only the first is used)
    pub n: u32,

    /// OpenAI configuration
    pub openai: OpenAiConfig,

    /// Ollama (local) configuration
    pub ollama: OllamaConfig,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            max_tokens: 150,
            temperature: 0.3,
            n: 1,
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model for the legacy completions endpoint
    pub model: String,

    /// Model for the chat completions endpoint
    pub chat_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
