//! Error types for the alt-text pipeline.
//!
//! Errors are organized by stage (config, image intake, provider calls,
//! generation) so the HTTP layer can map each one to a status code.

use thiserror::Error;

use crate::vision::ProviderKind;

/// Top-level error type for alttext operations.
#[derive(Error, Debug)]
pub enum AltTextError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The uploaded image was rejected
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Generating alt text failed
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A provider is enabled but its credentials are not set
    #[error("{provider} credentials not set: {hint}")]
    MissingCredentials { provider: String, hint: String },

    /// Unknown completion provider name
    #[error("Unknown completion provider: {0}")]
    UnknownProvider(String),
}

/// Errors raised while accepting an uploaded image.
#[derive(Error, Debug)]
pub enum ImageError {
    /// Not a `data:image/<type>;base64,` URI
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Payload is not valid base64
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Payload is empty after decoding
    #[error("Image payload is empty")]
    Empty,

    /// Magic bytes don't match any supported format
    #[error("Unrecognized image format (invalid magic bytes)")]
    UnrecognizedFormat,

    /// Payload exceeds the upload limit
    #[error("Image too large ({size_kb}KB > {max_kb}KB)")]
    TooLarge { size_kb: u64, max_kb: u64 },

    /// Decoding or re-encoding failed during compression
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Decoding took longer than the configured limit
    #[error("Image decode timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Errors from a remote vision or completion API.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Request failed, returned a non-success status, or had an unusable body
    #[error("{message}")]
    Http {
        message: String,
        /// HTTP status code, if the failure came from an HTTP response
        status_code: Option<u16>,
    },

    /// The call exceeded its timeout
    #[error("{stage} timed out after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// The vendor could not be reached (connect failure, socket timeout)
    #[error("{message}")]
    Unreachable { message: String },

    /// Signing the request failed
    #[error("Request signing failed: {0}")]
    Signing(String),
}

impl ProviderError {
    /// Shorthand for an HTTP-layer failure without a status code.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            status_code: None,
        }
    }
}

/// Failure of a single provider pipeline, reported by the generator.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The vision analysis step failed
    #[error("{provider} analysis failed: {source}")]
    Vision {
        provider: ProviderKind,
        #[source]
        source: ProviderError,
    },

    /// The completion step failed
    #[error("Completion for {provider} failed: {source}")]
    Completion {
        provider: ProviderKind,
        #[source]
        source: ProviderError,
    },

    /// No vision provider is enabled
    #[error("No vision providers are enabled")]
    NoProviders,
}

/// Convenience type alias for alttext results.
pub type Result<T> = std::result::Result<T, AltTextError>;
