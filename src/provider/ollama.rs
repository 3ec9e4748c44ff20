//! Ollama provider for local LLM execution
//!
//! Executes prompts via Ollama's local generate API. Requests carrying an
//! output schema set `format: "json"`. The base URL comes from the
//! `OLLAMA_HOST` environment variable and is validated up front.

use super::{Capabilities, GenerateRequest, GenerateResponse, ModelProvider, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default Ollama API endpoint
const DEFAULT_HOST: &str = "http://localhost:11434";

/// Default model
const DEFAULT_MODEL: &str = "llama3.2";

/// Ollama provider for local LLM execution
pub struct OllamaProvider {
    /// HTTP client
    client: reqwest::Client,
    /// Validated Ollama base URL
    base_url: Url,
    /// Model to use
    model: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// Uses `OLLAMA_HOST` if set, otherwise the local default.
    pub fn new() -> Result<Self> {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::with_host(&host)
    }

    /// Create with a specific host URL
    pub fn with_host(host: &str) -> Result<Self> {
        let base_url =
            Url::parse(host).with_context(|| format!("Invalid Ollama host URL: '{}'", host))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Set model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ollama()
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let endpoint = self
            .base_url
            .join("api/generate")
            .context("Failed to build Ollama endpoint URL")?;

        let system = match (&request.system_prompt, request.schema_instruction()) {
            (Some(persona), Some(instruction)) => Some(format!("{}\n\n{}", persona, instruction)),
            (Some(persona), None) => Some(persona.clone()),
            (None, Some(instruction)) => Some(instruction),
            (None, None) => None,
        };

        let payload = OllamaRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            prompt: request.prompt.clone(),
            system,
            format: if request.output_schema.is_null() {
                None
            } else {
                Some("json".to_string())
            },
            stream: false,
        };

        tracing::debug!(
            provider = "ollama",
            host = %self.base_url,
            model = %payload.model,
            "Sending request to Ollama"
        );

        let response = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Ollama (is it running?)")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "ollama",
                status = %status,
                error = %error_text,
                "Ollama API error"
            );
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        let api_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        let usage = match (api_response.prompt_eval_count, api_response.eval_count) {
            (Some(p), Some(c)) => TokenUsage::new(p, c),
            _ => TokenUsage::estimate(request.prompt.len(), api_response.response.len()),
        };

        Ok(GenerateResponse::new(api_response.response).with_usage(usage))
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_name() {
        let provider = OllamaProvider::with_host(DEFAULT_HOST).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_ollama_capabilities() {
        let provider = OllamaProvider::with_host(DEFAULT_HOST).unwrap();
        let caps = provider.capabilities();
        assert!(caps.json_mode);
        assert_eq!(caps.max_context, 8_192);
    }

    #[test]
    fn test_ollama_with_host() {
        let provider = OllamaProvider::with_host("http://192.168.1.100:11434").unwrap();
        assert_eq!(provider.base_url.as_str(), "http://192.168.1.100:11434/");
    }

    #[test]
    fn test_ollama_rejects_invalid_host() {
        assert!(OllamaProvider::with_host("not a url").is_err());
    }

    #[test]
    fn test_ollama_with_model() {
        let provider = OllamaProvider::with_host(DEFAULT_HOST)
            .unwrap()
            .with_model("mistral");
        assert_eq!(provider.model, "mistral");
    }
}
