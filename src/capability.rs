//! Seams to the outside world: the completion and lookup capabilities.
//!
//! The pipeline never talks to an LLM SDK or HTTP client directly. It holds
//! an `Arc<dyn CompletionCapability>` and an `Arc<dyn LookupCapability>`
//! taken from [`AnalyzerConfig`], so tests can swap in canned fakes and each
//! request stays isolated from every other.

use crate::agent::DrugInfoAgent;
use crate::config::AnalyzerConfig;
use crate::drug_info::OpenFdaClient;
use crate::error::AnalyzerError;
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
/// Default model for the Gemini provider.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// One prompt for a completion capability.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub image: Option<EncodedImage>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_image(mut self, image: EncodedImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// A text/vision generation service: prompt in, free-form text out.
///
/// No schema is enforced on the answer.
#[async_trait]
pub trait CompletionCapability: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalyzerError>;
}

/// Looks up and summarises one medication.
#[async_trait]
pub trait LookupCapability: Send + Sync {
    /// `instruction` is the natural-language request naming `medication`.
    async fn lookup(&self, medication: &str, instruction: &str) -> Result<String, AnalyzerError>;
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// [`CompletionCapability`] backed by an `edgequake_llm` provider.
pub struct ProviderCompleter {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl ProviderCompleter {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CompletionCapability for ProviderCompleter {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalyzerError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage::system(system));
        }
        match request.image {
            Some(image) => messages.push(ChatMessage::user_with_images(
                request.prompt.as_str(),
                vec![image.to_image_data()],
            )),
            None => messages.push(ChatMessage::user(request.prompt.as_str())),
        }

        let options = self.build_options();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| AnalyzerError::CompletionUnavailable {
                reason: e.to_string(),
            })?;

        debug!(
            "Completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// The completion capability for this config: the injected override, or a
/// [`ProviderCompleter`] over the resolved provider.
pub fn resolve_completion(
    config: &AnalyzerConfig,
) -> Result<Arc<dyn CompletionCapability>, AnalyzerError> {
    if let Some(ref completion) = config.completion {
        return Ok(Arc::clone(completion));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(ProviderCompleter::new(provider, config)))
}

/// The lookup capability for this config: the injected override, or a
/// [`DrugInfoAgent`] combining openFDA with `completion`.
pub fn resolve_lookup(
    config: &AnalyzerConfig,
    completion: Arc<dyn CompletionCapability>,
) -> Result<Arc<dyn LookupCapability>, AnalyzerError> {
    if let Some(ref lookup) = config.lookup {
        return Ok(Arc::clone(lookup));
    }
    let tool = OpenFdaClient::from_config(config)?;
    Ok(Arc::new(DrugInfoAgent::new(Arc::new(tool), completion)))
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`RXSCAN_LLM_PROVIDER` + `RXSCAN_MODEL`).
/// 4. **Gemini key present** (`GEMINI_API_KEY`), the free-tier default.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &AnalyzerConfig) -> Result<Arc<dyn LLMProvider>, AnalyzerError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(name));
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("RXSCAN_LLM_PROVIDER"),
        std::env::var("RXSCAN_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(gemini_key) = std::env::var("GEMINI_API_KEY") {
        if !gemini_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
            return create_vision_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AnalyzerError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn default_model_for(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" => DEFAULT_GEMINI_MODEL,
        _ => DEFAULT_MODEL,
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AnalyzerError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AnalyzerError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
