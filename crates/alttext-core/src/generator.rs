//! Alt-text generation: fan an image out to every vision provider, build a
//! prompt from each analysis, and complete each prompt.
//!
//! The per-provider pipelines run concurrently by default. Results always
//! come back in provider order (Rekognition, Google, Azure) regardless of
//! which finished first.

use crate::completion::{
    CompletionProvider, CompletionProviderFactory, CompletionRequest,
};
use crate::config::{CompletionConfig, Config, PipelineConfig};
use crate::error::{ConfigError, GenerateError, ProviderError};
use crate::prompt::PromptBuilder;
use crate::retry::RetryPolicy;
use crate::upload::ImageInput;
use crate::vision::{ProviderKind, VisionProvider, VisionProviderFactory};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Options for the fan-out.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Run provider pipelines concurrently
    pub parallel: bool,
    /// Report provider failures inline instead of failing the whole call
    pub partial_results: bool,
    /// Maximum retries per provider call
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for GenerateOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            parallel: config.parallel,
            partial_results: config.partial_results,
            retry_attempts: config.retry_attempts,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

/// Alt text produced from one provider's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAltText {
    /// Provider display name, e.g. "Google CV"
    pub provider: String,
    /// Generated alt text (empty when `error` is set)
    pub generated_alt_text: String,
    /// Failure message, only with partial results enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GeneratedAltText {
    fn success(kind: ProviderKind, text: String) -> Self {
        Self {
            provider: kind.display_name().to_string(),
            generated_alt_text: text,
            error: None,
        }
    }

    fn failure(kind: ProviderKind, error: &GenerateError) -> Self {
        Self {
            provider: kind.display_name().to_string(),
            generated_alt_text: String::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Runs vision → prompt → completion for every configured provider.
pub struct AltTextGenerator {
    vision: Vec<Arc<dyn VisionProvider>>,
    completion: Arc<dyn CompletionProvider>,
    prompts: PromptBuilder,
    completion_config: CompletionConfig,
    options: GenerateOptions,
}

impl AltTextGenerator {
    pub fn new(
        vision: Vec<Box<dyn VisionProvider>>,
        completion: Box<dyn CompletionProvider>,
        prompts: PromptBuilder,
        completion_config: CompletionConfig,
        options: GenerateOptions,
    ) -> Self {
        let mut vision: Vec<Arc<dyn VisionProvider>> = vision.into_iter().map(Arc::from).collect();
        vision.sort_by_key(|p| p.kind());
        Self {
            vision,
            completion: Arc::from(completion),
            prompts,
            completion_config,
            options,
        }
    }

    /// Build providers and options from the full configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let vision = VisionProviderFactory::create_all(
            &config.vision,
            Duration::from_millis(config.limits.vision_timeout_ms),
        )?;
        let completion = CompletionProviderFactory::create(
            &config.completion,
            None,
            Duration::from_millis(config.limits.completion_timeout_ms),
        )?;
        Ok(Self::new(
            vision,
            completion,
            PromptBuilder::from_config(&config.vision),
            config.completion.clone(),
            GenerateOptions::from(&config.pipeline),
        ))
    }

    /// Replace the fan-out options.
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Providers that will be queried, in reporting order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.vision.iter().map(|p| p.kind()).collect()
    }

    /// Name of the completion provider.
    pub fn completion_provider(&self) -> &str {
        self.completion.name()
    }

    /// Whether the completion provider is configured and reachable.
    pub async fn completion_available(&self) -> bool {
        self.completion.is_available().await
    }

    /// Generate alt text from every provider.
    ///
    /// Without partial results, the first failure (in provider order) fails
    /// the whole call.
    pub async fn generate(
        &self,
        image: &ImageInput,
    ) -> Result<Vec<GeneratedAltText>, GenerateError> {
        if self.vision.is_empty() {
            return Err(GenerateError::NoProviders);
        }

        let start = Instant::now();
        tracing::info!(
            hash = image.short_hash(),
            bytes = image.bytes.len(),
            providers = self.vision.len(),
            parallel = self.options.parallel,
            "Generating alt text"
        );

        let outcomes: Vec<(ProviderKind, Result<GeneratedAltText, GenerateError>)> =
            if self.options.parallel {
                join_all(
                    self.vision
                        .iter()
                        .map(|p| async move { (p.kind(), self.run_provider(p.as_ref(), image).await) }),
                )
                .await
            } else {
                let mut outcomes = Vec::with_capacity(self.vision.len());
                for provider in &self.vision {
                    let result = self.run_provider(provider.as_ref(), image).await;
                    let failed = result.is_err();
                    outcomes.push((provider.kind(), result));
                    if failed && !self.options.partial_results {
                        break;
                    }
                }
                outcomes
            };

        let mut results = Vec::with_capacity(outcomes.len());
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(alt_text) => results.push(alt_text),
                Err(e) if self.options.partial_results => {
                    tracing::warn!("{e}");
                    results.push(GeneratedAltText::failure(kind, &e));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            hash = image.short_hash(),
            "Generated {} alt texts in {}ms",
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    /// Vision analysis, prompt assembly and completion for one provider.
    async fn run_provider(
        &self,
        provider: &dyn VisionProvider,
        image: &ImageInput,
    ) -> Result<GeneratedAltText, GenerateError> {
        let kind = provider.kind();

        let analysis = self
            .with_retry(&format!("{kind} analysis"), provider.timeout(), || {
                provider.analyze(image)
            })
            .await
            .map_err(|source| GenerateError::Vision {
                provider: kind,
                source,
            })?;
        if analysis.kind() != kind {
            return Err(GenerateError::Vision {
                provider: kind,
                source: ProviderError::http(format!("returned an analysis from {}", analysis.kind())),
            });
        }

        let prompt = self.prompts.build(&analysis);
        tracing::debug!(provider = %kind, "Prompt: {prompt}");

        let request = CompletionRequest::from_config(prompt, &self.completion_config);
        let response = self
            .with_retry(
                &format!("{kind} completion"),
                self.completion.timeout(),
                || self.completion.complete(&request),
            )
            .await
            .map_err(|source| GenerateError::Completion {
                provider: kind,
                source,
            })?;

        tracing::debug!(
            provider = %kind,
            model = %response.model,
            tokens = ?response.tokens_used,
            latency_ms = response.latency_ms,
            "Completion received"
        );
        Ok(GeneratedAltText::success(kind, response.text))
    }

    /// Run `call` with a timeout, retrying transient failures with backoff.
    async fn with_retry<T, F, Fut>(
        &self,
        stage: &str,
        timeout: Duration,
        mut call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let policy = RetryPolicy::new(self.options.retry_attempts, self.options.retry_delay_ms);
        let mut retries = 0;
        loop {
            let result = match tokio::time::timeout(timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    stage: stage.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let Some(delay) = policy.next_delay(retries, &e) else {
                        return Err(e);
                    };
                    retries += 1;
                    tracing::debug!(
                        "Retry {retries}/{} for {stage} after {delay:?}: {e}",
                        policy.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::completion::CompletionResponse;
    use crate::http::stub::{refused_url, StubServer};
    use crate::vision::google::{AnnotateImageResponse, EntityAnnotation};
    use crate::vision::rekognition::{DetectLabelsResponse, Label};
    use crate::vision::azure::ImageAnalysis;
    use crate::vision::Analysis;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Vision mock: returns a canned analysis, optionally failing the first N calls.
    pub(crate) struct MockVision {
        kind: ProviderKind,
        fail_first: u32,
        status_code: Option<u16>,
        delay: Option<Duration>,
        calls: Arc<AtomicU32>,
    }

    impl MockVision {
        pub(crate) fn ok(kind: ProviderKind) -> Self {
            Self {
                kind,
                fail_first: 0,
                status_code: None,
                delay: None,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        pub(crate) fn failing(kind: ProviderKind, status_code: u16) -> Self {
            Self {
                fail_first: u32::MAX,
                status_code: Some(status_code),
                ..Self::ok(kind)
            }
        }

        fn fail_then_succeed(kind: ProviderKind, failures: u32, status_code: u16) -> Self {
            Self {
                fail_first: failures,
                status_code: Some(status_code),
                ..Self::ok(kind)
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> Arc<AtomicU32> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl VisionProvider for MockVision {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn analyze(&self, _image: &ImageInput) -> Result<Analysis, ProviderError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if idx < self.fail_first {
                return Err(ProviderError::Http {
                    message: format!("{} HTTP {:?}", self.kind, self.status_code),
                    status_code: self.status_code,
                });
            }
            Ok(match self.kind {
                ProviderKind::Rekognition => Analysis::Rekognition(DetectLabelsResponse {
                    labels: vec![Label {
                        name: "Dog".to_string(),
                        confidence: 99.0,
                    }],
                }),
                ProviderKind::Google => Analysis::Google(AnnotateImageResponse {
                    label_annotations: vec![EntityAnnotation {
                        description: "Beach".to_string(),
                        score: 0.95,
                    }],
                    ..Default::default()
                }),
                ProviderKind::Azure => Analysis::Azure(ImageAnalysis::default()),
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    /// Completion mock: echoes the first line of the prompt.
    pub(crate) struct EchoCompletion;

    #[async_trait]
    impl CompletionProvider for EchoCompletion {
        fn name(&self) -> &str {
            "echo"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            let first_line = request.prompt.lines().next().unwrap_or_default();
            Ok(CompletionResponse {
                text: format!("This image shows [{}]", first_line.trim()),
                model: "echo-1".to_string(),
                tokens_used: Some(10),
                latency_ms: 1,
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    pub(crate) fn generator(
        vision: Vec<Box<dyn VisionProvider>>,
        options: GenerateOptions,
    ) -> AltTextGenerator {
        AltTextGenerator::new(
            vision,
            Box::new(EchoCompletion),
            PromptBuilder::default(),
            CompletionConfig::default(),
            options,
        )
    }

    fn fast_options() -> GenerateOptions {
        GenerateOptions {
            parallel: true,
            partial_results: false,
            retry_attempts: 0,
            retry_delay_ms: 1,
        }
    }

    pub(crate) fn test_image() -> ImageInput {
        ImageInput::from_bytes(crate::upload::tests::PNG_HEADER.to_vec(), 5).unwrap()
    }

    #[tokio::test]
    async fn test_generates_one_entry_per_provider_in_order() {
        // Rekognition finishes last but is still reported first.
        let vision: Vec<Box<dyn VisionProvider>> = vec![
            Box::new(MockVision::ok(ProviderKind::Azure)),
            Box::new(MockVision::ok(ProviderKind::Rekognition).with_delay(Duration::from_millis(50))),
            Box::new(MockVision::ok(ProviderKind::Google)),
        ];
        let results = generator(vision, fast_options())
            .generate(&test_image())
            .await
            .unwrap();

        let providers: Vec<&str> = results.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(
            providers,
            vec!["Amazon Rekognition", "Google CV", "Azure Computer Vision"]
        );
        assert_eq!(
            results[0].generated_alt_text,
            "This image shows [This image contains the following labels: Dog.]"
        );
        assert_eq!(
            results[1].generated_alt_text,
            "This image shows [The image contains the following information: Labels: Beach.]"
        );
        assert!(results.iter().all(|r| r.error.is_none()));
    }

    #[tokio::test]
    async fn test_sequential_mode_matches_parallel_output() {
        let vision = || -> Vec<Box<dyn VisionProvider>> {
            ProviderKind::ALL
                .iter()
                .map(|k| Box::new(MockVision::ok(*k)) as Box<dyn VisionProvider>)
                .collect()
        };
        let parallel = generator(vision(), fast_options())
            .generate(&test_image())
            .await
            .unwrap();
        let sequential = generator(
            vision(),
            GenerateOptions {
                parallel: false,
                ..fast_options()
            },
        )
        .generate(&test_image())
        .await
        .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[tokio::test]
    async fn test_provider_failure_fails_whole_request() {
        let vision: Vec<Box<dyn VisionProvider>> = vec![
            Box::new(MockVision::ok(ProviderKind::Rekognition)),
            Box::new(MockVision::failing(ProviderKind::Google, 403)),
            Box::new(MockVision::ok(ProviderKind::Azure)),
        ];
        let err = generator(vision, fast_options())
            .generate(&test_image())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Vision {
                provider: ProviderKind::Google,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let azure = MockVision::ok(ProviderKind::Azure);
        let azure_calls = azure.calls();
        let vision: Vec<Box<dyn VisionProvider>> = vec![
            Box::new(MockVision::failing(ProviderKind::Rekognition, 400)),
            Box::new(azure),
        ];
        let options = GenerateOptions {
            parallel: false,
            ..fast_options()
        };
        assert!(generator(vision, options).generate(&test_image()).await.is_err());
        assert_eq!(azure_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_results_reports_failures_inline() {
        let vision: Vec<Box<dyn VisionProvider>> = vec![
            Box::new(MockVision::ok(ProviderKind::Rekognition)),
            Box::new(MockVision::failing(ProviderKind::Google, 401)),
        ];
        let options = GenerateOptions {
            partial_results: true,
            ..fast_options()
        };
        let results = generator(vision, options).generate(&test_image()).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].error.is_none());
        assert_eq!(results[1].provider, "Google CV");
        assert!(results[1].generated_alt_text.is_empty());
        assert!(results[1].error.as_ref().unwrap().contains("Google CV analysis failed"));
    }

    #[tokio::test]
    async fn test_retries_transient_vision_error() {
        let vision = MockVision::fail_then_succeed(ProviderKind::Google, 1, 429);
        let calls = vision.calls();
        let options = GenerateOptions {
            retry_attempts: 2,
            ..fast_options()
        };
        let results = generator(vec![Box::new(vision)], options)
            .generate(&test_image())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let vision = MockVision::failing(ProviderKind::Azure, 401);
        let calls = vision.calls();
        let options = GenerateOptions {
            retry_attempts: 3,
            ..fast_options()
        };
        let result = generator(vec![Box::new(vision)], options)
            .generate(&test_image())
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_providers_is_error() {
        let err = generator(vec![], fast_options())
            .generate(&test_image())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::NoProviders));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        struct SlowVision;

        #[async_trait]
        impl VisionProvider for SlowVision {
            fn kind(&self) -> ProviderKind {
                ProviderKind::Azure
            }

            async fn analyze(&self, _image: &ImageInput) -> Result<Analysis, ProviderError> {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(Analysis::Azure(ImageAnalysis::default()))
            }

            fn timeout(&self) -> Duration {
                Duration::from_millis(20)
            }
        }

        let err = generator(vec![Box::new(SlowVision)], fast_options())
            .generate(&test_image())
            .await
            .unwrap_err();
        match err {
            GenerateError::Vision {
                source: ProviderError::Timeout { timeout_ms, .. },
                ..
            } => assert_eq!(timeout_ms, 20),
            other => panic!("Expected timeout, got {other}"),
        }
    }

    fn google_via(base_url: &str) -> Box<dyn VisionProvider> {
        Box::new(crate::vision::google::GoogleVisionProvider::new(
            base_url,
            "k",
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_vendor_503_is_retried() {
        let server = StubServer::start(vec![
            (503, r#"{"error": {"code": 503, "message": "backend unavailable"}}"#),
            (200, r#"{"responses": [{"labelAnnotations": [{"description": "Dog", "score": 0.97}]}]}"#),
        ])
        .await;
        let options = GenerateOptions {
            retry_attempts: 2,
            ..fast_options()
        };

        let results = generator(vec![google_via(&server.base_url)], options)
            .generate(&test_image())
            .await
            .unwrap();
        assert_eq!(server.hits(), 2);
        assert!(results[0].generated_alt_text.contains("Labels: Dog."));
    }

    #[tokio::test]
    async fn test_vendor_401_is_not_retried() {
        let server = StubServer::start(vec![(
            401,
            r#"{"error": {"code": 401, "message": "API key not valid"}}"#,
        )])
        .await;
        let options = GenerateOptions {
            retry_attempts: 3,
            ..fast_options()
        };

        let err = generator(vec![google_via(&server.base_url)], options)
            .generate(&test_image())
            .await
            .unwrap_err();
        assert_eq!(server.hits(), 1);
        assert!(matches!(
            err,
            GenerateError::Vision {
                source: ProviderError::Http { status_code: Some(401), .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_vendor_is_retried_then_reported() {
        let options = GenerateOptions {
            retry_attempts: 1,
            ..fast_options()
        };
        let err = generator(vec![google_via(&refused_url().await)], options)
            .generate(&test_image())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Vision {
                source: ProviderError::Unreachable { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_mismatched_analysis_is_rejected() {
        struct MislabeledVision;

        #[async_trait]
        impl VisionProvider for MislabeledVision {
            fn kind(&self) -> ProviderKind {
                ProviderKind::Google
            }

            async fn analyze(&self, _image: &ImageInput) -> Result<Analysis, ProviderError> {
                Ok(Analysis::Azure(ImageAnalysis::default()))
            }

            fn timeout(&self) -> Duration {
                Duration::from_secs(1)
            }
        }

        let err = generator(vec![Box::new(MislabeledVision)], fast_options())
            .generate(&test_image())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Google CV analysis failed: returned an analysis from Azure Computer Vision"
        );
    }

    #[test]
    fn test_serializes_camel_case_without_error() {
        let entry = GeneratedAltText::success(ProviderKind::Google, "This image shows".to_string());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"provider": "Google CV", "generatedAltText": "This image shows"})
        );
    }
}
