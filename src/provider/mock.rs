//! Mock provider for testing
//!
//! Returns configurable replies without making real API calls. Essential
//! for unit tests and CI pipelines. When the reply queue is empty it
//! synthesizes a minimal JSON object from the request's output schema, so
//! offline CLI runs against `--provider mock` still produce conforming
//! results.

use super::{Capabilities, GenerateRequest, GenerateResponse, ModelProvider, TokenUsage};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One queued reply: a body or a simulated transport failure, with
/// optional latency before it resolves.
#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: Result<String, String>,
    latency: Option<Duration>,
}

impl MockReply {
    /// A reply body returned as-is
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            outcome: Ok(body.into()),
            latency: None,
        }
    }

    /// A simulated transport failure
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            latency: None,
        }
    }

    /// Delay the reply by the given duration
    pub fn after(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Mock provider that returns predefined replies (FIFO)
pub struct MockProvider {
    /// Queue of replies to return
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    /// Default reply when the queue is empty (None = synthesize from schema)
    default_reply: Option<String>,
    /// Track all requests made (for assertions)
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with schema-synthesized defaults
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            default_reply: None,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Create with a queue of reply bodies
    pub fn with_replies(replies: Vec<String>) -> Self {
        let provider = Self::new();
        {
            let mut queue = provider.replies.lock().unwrap();
            queue.extend(replies.into_iter().map(MockReply::ok));
        }
        provider
    }

    /// Set a fixed default reply instead of schema synthesis
    pub fn with_default(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = Some(reply.into());
        self
    }

    /// Add a reply to the queue
    pub fn queue_reply(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Get all requests made to this provider
    pub fn get_requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Clear all recorded requests
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Build a minimal object satisfying the request's output schema.
    ///
    /// Fills only required fields: strings get a "mock <name>" value,
    /// integers their minimum, booleans true, arrays stay empty.
    fn synthesize(schema: &Value) -> String {
        let mut object = serde_json::Map::new();

        let required: Vec<&str> = schema["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for name in required {
            let property = &schema["properties"][name];
            let ty = match &property["type"] {
                Value::String(t) => t.as_str(),
                Value::Array(ts) => ts
                    .iter()
                    .filter_map(Value::as_str)
                    .find(|t| *t != "null")
                    .unwrap_or("string"),
                _ => "string",
            };
            let value = match ty {
                "integer" | "number" => {
                    let minimum = &property["minimum"];
                    if minimum.is_number() {
                        minimum.clone()
                    } else {
                        Value::from(0)
                    }
                }
                "boolean" => Value::Bool(true),
                "array" => Value::Array(vec![]),
                _ => Value::String(format!("mock {}", name)),
            };
            object.insert(name.to_string(), value);
        }

        Value::Object(object).to_string()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::mock()
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        // Record the request
        self.requests.lock().unwrap().push(request.clone());

        // Get reply from queue, or fall back to the default
        let reply = self.replies.lock().unwrap().pop_front();
        let reply = match reply {
            Some(r) => r,
            None => match &self.default_reply {
                Some(body) => MockReply::ok(body.clone()),
                None => MockReply::ok(Self::synthesize(&request.output_schema)),
            },
        };

        if let Some(latency) = reply.latency {
            tokio::time::sleep(latency).await;
        }

        match reply.outcome {
            Ok(body) => {
                let usage = TokenUsage::estimate(request.prompt.len(), body.len());
                Ok(GenerateResponse::new(body)
                    .with_usage(usage)
                    .with_stop_reason("end_turn"))
            }
            Err(message) => anyhow::bail!(message),
        }
    }

    fn is_available(&self) -> bool {
        true // Mock is always available
    }
}
