//! OpenAI provider using the Chat Completions API.
//!
//! The prompt is sent as a single user message. Works with any
//! OpenAI-compatible endpoint.

use super::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::error::ProviderError;
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// OpenAI provider using Chat Completions.
pub struct OpenAiChatProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl OpenAiChatProvider {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            timeout,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    n: u32,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[async_trait]
impl CompletionProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        "openai-chat"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            n: request.n,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| http::send_error("OpenAI", e))?;

        let chat_resp: ChatResponse = http::read_json("OpenAI", resp).await?;

        let text = chat_resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default().trim().to_string())
            .ok_or_else(|| ProviderError::http("OpenAI returned no choices"))?;
        if text.is_empty() {
            tracing::warn!(model = %chat_resp.model, "OpenAI returned an empty message");
        }

        Ok(CompletionResponse {
            text,
            model: chat_resp.model,
            tokens_used: chat_resp.usage.map(|u| u.total_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "Labels: Dog.",
            }],
            n: 1,
            max_tokens: 150,
            temperature: 0.5,
        })
        .unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Labels: Dog.");
        assert_eq!(body["max_tokens"], 150);
    }

    #[test]
    fn test_parse_response_with_null_content() {
        let json = r#"{"model": "gpt-4o-mini", "choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.choices[0].message.content.is_none());
        assert!(resp.usage.is_none());
    }

    #[tokio::test]
    async fn test_null_content_becomes_empty_text() {
        let server = crate::http::stub::StubServer::start(vec![(
            200,
            r#"{"model": "gpt-4o-mini", "choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )])
        .await;
        let provider =
            OpenAiChatProvider::new(&server.base_url, "sk", "gpt-4o-mini", Duration::from_secs(5));
        let request = CompletionRequest {
            prompt: "Labels: Dog.".to_string(),
            max_tokens: 150,
            temperature: 0.3,
            n: 1,
        };

        let resp = provider.complete(&request).await.unwrap();
        assert_eq!(resp.text, "");
        assert_eq!(resp.model, "gpt-4o-mini");
    }
}
