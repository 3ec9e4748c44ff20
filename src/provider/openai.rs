//! OpenAI provider using the Chat Completions API
//!
//! Requires `OPENAI_API_KEY` environment variable. Requests carrying an
//! output schema run in JSON mode.

use super::{Capabilities, GenerateRequest, GenerateResponse, ModelProvider, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI provider that uses the OpenAI API
pub struct OpenAIProvider {
    /// HTTP client
    client: reqwest::Client,
    /// API key
    api_key: String,
    /// Model to use
    model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    ///
    /// Reads `OPENAI_API_KEY` from environment.
    pub fn new() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;

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

    /// Build messages array from request
    fn build_messages(&self, request: &GenerateRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        // JSON mode requires the conversation to mention JSON; the schema
        // instruction takes care of that.
        let mut system_parts = Vec::new();
        if let Some(ref system) = request.system_prompt {
            system_parts.push(system.clone());
        }
        if let Some(instruction) = request.schema_instruction() {
            system_parts.push(instruction);
        }
        if !system_parts.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_parts.join("\n\n"),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        messages
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::openai()
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let messages = self.build_messages(&request);

        let response_format: Option<Value> = if request.output_schema.is_null() {
            None
        } else {
            Some(json!({ "type": "json_object" }))
        };

        let payload = ChatCompletionRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format,
        };

        tracing::debug!(
            provider = "openai",
            model = %payload.model,
            messages_count = payload.messages.len(),
            "Sending request to OpenAI API"
        );

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "openai",
                status = %status,
                error = %error_text,
                "OpenAI API error"
            );
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        let usage = if let Some(u) = api_response.usage {
            TokenUsage::new(u.prompt_tokens, u.completion_tokens)
        } else {
            TokenUsage::estimate(request.prompt.len(), content.len())
        };

        tracing::debug!(
            provider = "openai",
            tokens = usage.total_tokens,
            "OpenAI API response received"
        );

        Ok(GenerateResponse::new(content).with_usage(usage))
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ============================================================================
// TESTS
// ============================================================================
