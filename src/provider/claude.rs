//! Claude provider using the Anthropic Messages API
//!
//! Requires `ANTHROPIC_API_KEY` environment variable.

use super::{Capabilities, GenerateRequest, GenerateResponse, ModelProvider, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Anthropic Messages API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// max_tokens is mandatory on the Messages API
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Claude provider using the Anthropic HTTP API
pub struct ClaudeProvider {
    /// HTTP client
    client: reqwest::Client,
    /// API key
    api_key: String,
    /// Model to use
    model: String,
}

impl ClaudeProvider {
    /// Create a new Claude provider
    ///
    /// Reads `ANTHROPIC_API_KEY` from environment.
    pub fn new() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;

        Ok(Self::with_api_key(api_key))
    }

    /// Create with a specific API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Combine persona and schema instruction into the system text
    fn build_system(&self, request: &GenerateRequest) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(ref system) = request.system_prompt {
            parts.push(system.clone());
        }
        if let Some(instruction) = request.schema_instruction() {
            parts.push(instruction);
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

#[async_trait]
impl ModelProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::claude()
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let payload = MessagesRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: self.build_system(&request),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        };

        tracing::debug!(
            provider = "claude",
            model = %payload.model,
            prompt_len = request.prompt.len(),
            "Sending request to Anthropic API"
        );

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "claude",
                status = %status,
                error = %error_text,
                "Anthropic API error"
            );
            anyhow::bail!("Anthropic API error ({}): {}", status, error_text);
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        let content = api_response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let usage = if let Some(u) = api_response.usage {
            TokenUsage::new(u.input_tokens, u.output_tokens)
        } else {
            TokenUsage::estimate(request.prompt.len(), content.len())
        };

        tracing::debug!(
            provider = "claude",
            tokens = usage.total_tokens,
            "Anthropic API response received"
        );

        let mut result = GenerateResponse::new(content).with_usage(usage);
        if let Some(stop_reason) = api_response.stop_reason {
            result = result.with_stop_reason(stop_reason);
        }
        Ok(result)
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<UsageInfo>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    input_tokens: u32,
    output_tokens: u32,
}

// ============================================================================
// TESTS
// ============================================================================
