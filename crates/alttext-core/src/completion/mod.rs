//! Text completion providers that turn a vision summary into alt text.
//!
//! Provides a provider abstraction over the OpenAI Completions API, the
//! OpenAI Chat Completions API, and a local Ollama instance.

mod ollama;
mod openai;
mod openai_chat;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use openai_chat::OpenAiChatProvider;

use crate::config::{resolve_env_var, CompletionConfig};
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use std::time::Duration;

/// A request to complete a prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Number of choices to request; only the first is used
    pub n: u32,
}

impl CompletionRequest {
    /// Build a request using the configured generation settings.
    pub fn from_config(prompt: String, config: &CompletionConfig) -> Self {
        Self {
            prompt,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            n: config.n,
        }
    }
}

/// The response from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// First choice text, trimmed
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (prompt + completion), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all completion providers implement.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Complete the given prompt.
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Factory that creates the configured completion provider.
pub struct CompletionProviderFactory;

impl CompletionProviderFactory {
    /// Create the provider named by `config.provider`.
    ///
    /// # Arguments
    /// * `config` - The completion config section
    /// * `model_override` - Optional model name that overrides the config default
    /// * `timeout` - Per-request timeout
    pub fn create(
        config: &CompletionConfig,
        model_override: Option<&str>,
        timeout: Duration,
    ) -> Result<Box<dyn CompletionProvider>, ConfigError> {
        match config.provider.as_str() {
            "openai" | "openai-chat" => {
                let cfg = &config.openai;
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or_else(|| ConfigError::MissingCredentials {
                        provider: "OpenAI".to_string(),
                        hint: "set the OPENAI_API_KEY env var".to_string(),
                    })?;
                if config.provider == "openai" {
                    let model = model_override.unwrap_or(&cfg.model);
                    Ok(Box::new(OpenAiProvider::new(
                        &cfg.endpoint,
                        &api_key,
                        model,
                        timeout,
                    )))
                } else {
                    let model = model_override.unwrap_or(&cfg.chat_model);
                    Ok(Box::new(OpenAiChatProvider::new(
                        &cfg.endpoint,
                        &api_key,
                        model,
                        timeout,
                    )))
                }
            }
            "ollama" => {
                let cfg = &config.ollama;
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(OllamaProvider::new(&cfg.endpoint, model, timeout)))
            }
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}
