//! # Provider Abstraction Layer
//!
//! Trait and implementations for the external model capability.
//!
//! ## Overview
//!
//! The provider module defines how Aisle talks to text-generation
//! backends:
//!
//! - [`ModelProvider`] - Core trait for structured generation
//! - [`ClaudeProvider`] - Anthropic Messages API
//! - [`OpenAIProvider`] - OpenAI Chat Completions with JSON mode
//! - [`OllamaProvider`] - Local Ollama with JSON format
//! - [`MockProvider`] - Test provider with canned replies
//!
//! Every request carries the flow's output JSON Schema; providers embed
//! it in the system text so the model replies with a single conforming
//! JSON object. Whether the reply actually conforms is checked by the
//! flow wrapper, never trusted.
//!
//! ## Creating Providers
//!
//! Use [`create_provider`] to instantiate a provider by name:
//!
//! ```rust
//! use aisle::provider::create_provider;
//!
//! let mock = create_provider("mock");
//! assert!(mock.is_ok());
//!
//! let unknown = create_provider("invalid");
//! assert!(unknown.is_err());
//! ```

mod claude;
mod mock;
mod ollama;
mod openai;

pub use claude::ClaudeProvider;
pub use mock::{MockProvider, MockReply};
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Average characters per token for mixed prose + JSON content.
/// Used when the API does not report actual counts.
const CHARS_PER_TOKEN: f32 = 3.5;

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Capabilities that a provider may support
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// Supports a native JSON output mode
    pub json_mode: bool,
    /// Maximum context window size
    pub max_context: usize,
}

impl Capabilities {
    pub fn claude() -> Self {
        Self {
            json_mode: false,
            max_context: 200_000,
        }
    }

    pub fn openai() -> Self {
        Self {
            json_mode: true,
            max_context: 128_000,
        }
    }

    pub fn ollama() -> Self {
        Self {
            json_mode: true,
            max_context: 8_192,
        }
    }

    pub fn mock() -> Self {
        Self {
            json_mode: true,
            max_context: 200_000,
        }
    }
}

// ============================================================================
// PROVIDER TRAIT (ASYNC)
// ============================================================================

/// Core trait that all model providers must implement
///
/// The trait abstracts away the differences between model APIs so the
/// flow wrapper can run a request/response cycle without knowing which
/// backend is in use, and so tests can inject a fake.
///
/// All methods are async to support HTTP-based API providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the provider name (e.g., "claude", "openai", "ollama")
    fn name(&self) -> &str;

    /// Returns the provider's capabilities
    fn capabilities(&self) -> Capabilities;

    /// Model used when neither the request nor the config names one
    fn default_model(&self) -> &str;

    /// Execute one generation request and return the raw reply.
    ///
    /// Exactly one outbound call per invocation: no retries, no caching.
    /// Transport failures (network, auth, quota) are `Err`; a completed
    /// call returns `Ok` even if the content turns out not to conform -
    /// conformance is the flow wrapper's job.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Check if this provider is usable (e.g., API key set)
    fn is_available(&self) -> bool {
        true
    }
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

/// Request for one structured generation
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// The rendered prompt
    pub prompt: String,

    /// Optional system prompt to set the persona
    pub system_prompt: Option<String>,

    /// Model to use (e.g., "claude-sonnet-4-5", "gpt-4o")
    pub model: String,

    /// JSON Schema the reply must conform to (Null = free text)
    pub output_schema: Value,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 - 1.0)
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    /// Create a new request with minimal required fields
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            output_schema: Value::Null,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the output JSON Schema
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }

    /// Set the maximum tokens to generate
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Instruction text telling the model to reply as conforming JSON.
    ///
    /// None when the request has no output schema.
    pub fn schema_instruction(&self) -> Option<String> {
        if self.output_schema.is_null() {
            return None;
        }
        Some(format!(
            "Reply with a single JSON object that conforms to this JSON Schema. \
             Output only the JSON object, with no prose and no code fences.\n\n{}",
            self.output_schema
        ))
    }
}

/// Reply from one completed generation
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// The generated content (expected to be a JSON object)
    pub content: String,

    /// Token usage statistics
    pub usage: TokenUsage,

    /// Stop reason (e.g., "end_turn", "max_tokens")
    pub stop_reason: Option<String>,
}

impl GenerateResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            stop_reason: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_stop_reason(mut self, stop_reason: impl Into<String>) -> Self {
        self.stop_reason = Some(stop_reason.into());
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    /// Estimate usage from character counts when the API reports none.
    pub fn estimate(prompt_len: usize, response_len: usize) -> Self {
        let prompt_tokens = (prompt_len as f32 / CHARS_PER_TOKEN).ceil() as u32;
        let completion_tokens = (response_len as f32 / CHARS_PER_TOKEN).ceil() as u32;
        Self::new(prompt_tokens, completion_tokens)
    }
}

// ============================================================================
// PROVIDER FACTORY
// ============================================================================

/// Create a provider instance by name
///
/// # Supported Providers
///
/// | Name | Description | Requires |
/// |------|-------------|----------|
/// | `claude` | Anthropic Messages API | `ANTHROPIC_API_KEY` env var |
/// | `openai` | OpenAI API | `OPENAI_API_KEY` env var |
/// | `ollama` | Local Ollama | Ollama running locally |
/// | `mock` | Testing | Nothing |
pub fn create_provider(name: &str) -> Result<Box<dyn ModelProvider>> {
    match name.to_lowercase().as_str() {
        "claude" => Ok(Box::new(ClaudeProvider::new()?)),
        "openai" => Ok(Box::new(OpenAIProvider::new()?)),
        "ollama" => Ok(Box::new(OllamaProvider::new()?)),
        "mock" => Ok(Box::new(MockProvider::new())),
        _ => anyhow::bail!(
            "Unknown provider: '{}'. Available: claude, openai, ollama, mock",
            name
        ),
    }
}

// ============================================================================
// TESTS
// ============================================================================
