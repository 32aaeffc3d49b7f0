//! Configuration types for prescription analysis.
//!
//! All analysis behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The config is the one process-wide context:
//! it is constructed once at startup, holds the API secrets and the
//! capabilities, and is passed by reference into every stage. Nothing in the
//! pipeline reads ambient state.

use crate::capability::{CompletionCapability, LookupCapability};
use crate::error::AnalyzerError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default openFDA API root.
pub const DEFAULT_FDA_BASE_URL: &str = "https://api.fda.gov";

/// Configuration for a prescription analysis.
///
/// # Example
/// ```rust
/// use rxscan::{AnalyzerConfig, EnrichmentPolicy};
///
/// let config = AnalyzerConfig::builder()
///     .model("gemini-2.0-flash")
///     .enrichment_policy(EnrichmentPolicy::Continue)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Completion capability override. Takes precedence over every provider
    /// setting; used by tests and by callers with their own model gateway.
    pub completion: Option<Arc<dyn CompletionCapability>>,

    /// Lookup capability override. When None, the openFDA-backed
    /// [`crate::agent::DrugInfoAgent`] is used.
    pub lookup: Option<Arc<dyn LookupCapability>>,

    /// openFDA API key. Optional: without it the `api_key` query parameter is
    /// simply omitted and the anonymous rate limit applies.
    pub fda_api_key: Option<String>,

    /// openFDA API root. Default: [`DEFAULT_FDA_BASE_URL`].
    pub fda_base_url: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription wants the model to read, not to improvise.
    pub temperature: f32,

    /// Maximum tokens per completion. Default: 2048.
    pub max_tokens: usize,

    /// Timeout for the extraction completion, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Timeout for one medication lookup (HTTP fetch plus summary), in
    /// seconds. Default: 30.
    pub lookup_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// What a failed lookup does to the rest of the medication list.
    /// Default: [`EnrichmentPolicy::FailFast`].
    pub enrichment_policy: EnrichmentPolicy,

    /// Custom extraction prompt. If None, uses
    /// [`crate::prompts::EXTRACTION_PROMPT`].
    pub extraction_prompt: Option<String>,

    /// Receives per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            completion: None,
            lookup: None,
            fda_api_key: None,
            fda_base_url: DEFAULT_FDA_BASE_URL.to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            api_timeout_secs: 60,
            lookup_timeout_secs: 30,
            download_timeout_secs: 120,
            enrichment_policy: EnrichmentPolicy::default(),
            extraction_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "completion",
                &self.completion.as_ref().map(|_| "<dyn CompletionCapability>"),
            )
            .field("lookup", &self.lookup.as_ref().map(|_| "<dyn LookupCapability>"))
            .field("fda_api_key", &self.fda_api_key.as_ref().map(|_| "<redacted>"))
            .field("fda_base_url", &self.fda_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("lookup_timeout_secs", &self.lookup_timeout_secs)
            .field("enrichment_policy", &self.enrichment_policy)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus the secrets found in the environment (`FDA_API_KEY`).
    ///
    /// The model-access key is not read here: the provider factory picks it
    /// up (`GEMINI_API_KEY`, `OPENAI_API_KEY`, …) when the provider is built.
    pub fn from_env() -> Self {
        Self {
            fda_api_key: std::env::var("FDA_API_KEY").ok().filter(|k| !k.is_empty()),
            ..Self::default()
        }
    }
}

/// Builder for [`AnalyzerConfig`].
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl fmt::Debug for AnalyzerConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl AnalyzerConfigBuilder {
    /// Start from an existing config, e.g. [`AnalyzerConfig::from_env`].
    pub fn from_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn completion(mut self, completion: Arc<dyn CompletionCapability>) -> Self {
        self.config.completion = Some(completion);
        self
    }

    pub fn lookup(mut self, lookup: Arc<dyn LookupCapability>) -> Self {
        self.config.lookup = Some(lookup);
        self
    }

    pub fn fda_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.fda_api_key = Some(key.into());
        self
    }

    pub fn fda_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.fda_base_url = url.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn lookup_timeout_secs(mut self, secs: u64) -> Self {
        self.config.lookup_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn enrichment_policy(mut self, policy: EnrichmentPolicy) -> Self {
        self.config.enrichment_policy = policy;
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 || c.lookup_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if !c.fda_base_url.starts_with("http://") && !c.fda_base_url.starts_with("https://") {
            return Err(AnalyzerError::InvalidConfig(format!(
                "openFDA base URL must be HTTP(S), got '{}'",
                c.fda_base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the enrichment loop reacts when one medication's lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnrichmentPolicy {
    /// Abort the remaining medications and return the error. (default)
    #[default]
    FailFast,
    /// Record `Lookup failed: <reason>` as that medication's info and move on.
    Continue,
}
