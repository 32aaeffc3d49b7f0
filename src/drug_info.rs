//! Drug-information fetch tool backed by the openFDA drug-label API.
//!
//! One read-only `GET /drug/label.json` per medication, keyed by brand name.
//! The tool returns a short observation for the agent:
//!
//! ```text
//! Side effects: <first 200 chars of adverse_reactions>...
//! Estimated Price: Check GoodRx
//! ```
//!
//! openFDA has no pricing data; the price line is a fixed pointer.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Fixed price pointer appended to every observation.
pub const PRICE_PLACEHOLDER: &str = "Check GoodRx";
/// Adverse-reaction text is cut to this many characters.
pub const SIDE_EFFECTS_CHARS: usize = 200;
/// Stand-in when the label or the field is missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Fetches raw drug information for one medication.
#[async_trait]
pub trait DrugInfoTool: Send + Sync {
    async fn fetch_drug_info(&self, medication: &str) -> Result<String, AnalyzerError>;
}

/// [`DrugInfoTool`] that queries openFDA.
pub struct OpenFdaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl OpenFdaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_secs,
        })
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        Self::new(
            config.fda_base_url.clone(),
            config.fda_api_key.clone(),
            config.lookup_timeout_secs,
        )
    }

    /// Label search URL for `medication`. `api_key` is appended only when
    /// a key is configured.
    pub fn label_url(&self, medication: &str) -> Result<Url, AnalyzerError> {
        let endpoint = format!("{}/drug/label.json", self.base_url.trim_end_matches('/'));
        let search = format!("openfda.brand_name:\"{}\"", medication);
        let mut params = vec![("search", search.as_str()), ("limit", "1")];
        if let Some(ref key) = self.api_key {
            params.push(("api_key", key.as_str()));
        }
        Url::parse_with_params(&endpoint, &params)
            .map_err(|e| AnalyzerError::InvalidConfig(format!("openFDA URL '{endpoint}': {e}")))
    }

    fn unavailable(&self, medication: &str, reason: impl Into<String>) -> AnalyzerError {
        AnalyzerError::LookupUnavailable {
            medication: medication.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DrugInfoTool for OpenFdaClient {
    async fn fetch_drug_info(&self, medication: &str) -> Result<String, AnalyzerError> {
        let url = self.label_url(medication)?;
        debug!("openFDA lookup: {}", medication);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                self.unavailable(
                    medication,
                    format!("openFDA timed out after {}s", self.timeout_secs),
                )
            } else {
                self.unavailable(medication, format!("openFDA request failed: {e}"))
            }
        })?;

        // openFDA answers 404 when the search matches nothing.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(format_drug_info(&Value::Null));
        }
        if !response.status().is_success() {
            return Err(self.unavailable(medication, format!("openFDA HTTP {}", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.unavailable(medication, format!("openFDA response: {e}")))?;
        Ok(format_drug_info(&body))
    }
}

/// Build the observation text from an openFDA label search response.
pub fn format_drug_info(body: &Value) -> String {
    let side_effects = body
        .get("results")
        .and_then(|r| r.get(0))
        .and_then(|label| label.get("adverse_reactions"))
        .and_then(field_text)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let truncated: String = side_effects.chars().take(SIDE_EFFECTS_CHARS).collect();
    format!(
        "Side effects: {}... \nEstimated Price: {}",
        truncated, PRICE_PLACEHOLDER
    )
}

/// Label fields are arrays of paragraphs; join them into one string.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}
