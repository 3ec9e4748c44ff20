//! Flow definitions and the invocation wrapper
//!
//! A flow is a named, schema-typed request/response operation backed by a
//! single model call. [`FlowDef`] holds the declarative pieces (input
//! schema, prompt template, output schema, postcondition); [`FlowRunner`]
//! orchestrates one cycle:
//!
//! 1. serialize + validate the input (violations short-circuit before any
//!    external call)
//! 2. render the prompt template
//! 3. call the provider with the prompt and the output JSON Schema
//! 4. check the reply: empty, non-JSON, and schema-non-conforming replies
//!    each fail with their own error kind
//! 5. deserialize the conforming reply into the typed output
//!
//! Exactly one outbound call per invocation; transport failures and
//! nonsense replies are reported upward, never retried here.

mod answer;
mod availability;
mod popularity;

pub use answer::{answer_question, AnswerQuestionInput, AnswerQuestionOutput, ANSWER_QUESTION};
pub use availability::{
    check_availability, CheckAvailabilityInput, CheckAvailabilityOutput, CHECK_AVAILABILITY,
};
pub use popularity::{
    assess_popularity, AssessPopularityInput, AssessPopularityOutput, ASSESS_POPULARITY,
};

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use jsonschema::JSONSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::AisleError;
use crate::event_log::{EventKind, EventLog};
use crate::provider::{create_provider, GenerateRequest, ModelProvider};
use crate::schema::Schema;
use crate::template::PromptTemplate;

/// Cross-field rule checked after per-field validation passes
type Postcondition = fn(&Value) -> Result<(), String>;

/// Declarative definition of one flow
pub struct FlowDef<I, O> {
    name: &'static str,
    input_schema: Schema,
    output_schema: Schema,
    template: PromptTemplate,
    system_prompt: Option<&'static str>,
    postcondition: Option<Postcondition>,
    /// Compiled from `output_schema.to_json_schema()` at construction
    compiled_output: JSONSchema,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O> FlowDef<I, O>
where
    I: Serialize,
    O: DeserializeOwned,
{
    /// Define a flow.
    ///
    /// Fails if the template references a field the input schema does not
    /// declare, so a broken definition cannot reach runtime.
    pub fn new(
        name: &'static str,
        input_schema: Schema,
        template: &str,
        output_schema: Schema,
    ) -> Result<Self, AisleError> {
        let template = PromptTemplate::parse(template, &input_schema)?;
        let json_schema = output_schema.to_json_schema();
        let compiled_output =
            JSONSchema::compile(&json_schema).map_err(|e| AisleError::SchemaFailed {
                flow: name.to_string(),
                details: e.to_string(),
            })?;

        Ok(Self {
            name,
            input_schema,
            output_schema,
            template,
            system_prompt: None,
            postcondition: None,
            compiled_output,
            _marker: PhantomData,
        })
    }

    /// Set the system prompt (persona)
    pub fn with_system_prompt(mut self, system_prompt: &'static str) -> Self {
        self.system_prompt = Some(system_prompt);
        self
    }

    /// Attach a cross-field postcondition on the output
    pub fn with_postcondition(mut self, postcondition: Postcondition) -> Self {
        self.postcondition = Some(postcondition);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Validate a serialized input against the input schema.
    pub fn validate_input(&self, value: &Value) -> Result<(), AisleError> {
        self.input_schema
            .validate(value)
            .map_err(|violations| AisleError::InvalidInput {
                flow: self.name.to_string(),
                violations,
            })
    }

    /// Check a raw model reply and deserialize it into the typed output.
    ///
    /// Returns both the typed output and the raw JSON value (for the
    /// event log). Distinguishes empty, non-JSON, and non-conforming
    /// replies so callers can tell what went wrong.
    pub fn parse_output(&self, raw: &str) -> Result<(O, Value), AisleError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AisleError::EmptyResponse {
                flow: self.name.to_string(),
            });
        }

        let value: Value =
            serde_json::from_str(trimmed).map_err(|e| AisleError::InvalidJson {
                flow: self.name.to_string(),
                details: e.to_string(),
            })?;

        // Structural pass with the compiled JSON Schema
        if let Err(errors) = self.compiled_output.validate(&value) {
            let details = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{} (at {})", e, path)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AisleError::SchemaFailed {
                flow: self.name.to_string(),
                details,
            });
        }

        // Interpreter pass: numeric ranges, calendar dates, list caps
        if let Err(violations) = self.output_schema.validate(&value) {
            let details = violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AisleError::SchemaFailed {
                flow: self.name.to_string(),
                details,
            });
        }

        if let Some(check) = self.postcondition {
            check(&value).map_err(|details| AisleError::SchemaFailed {
                flow: self.name.to_string(),
                details,
            })?;
        }

        let output: O =
            serde_json::from_value(value.clone()).map_err(|e| AisleError::SchemaFailed {
                flow: self.name.to_string(),
                details: e.to_string(),
            })?;

        Ok((output, value))
    }
}

/// Flow runner with cached providers and event logging
#[derive(Clone)]
pub struct FlowRunner {
    /// Cached providers (lock-free)
    providers: Arc<DashMap<String, Arc<dyn ModelProvider>>>,
    /// Default provider name
    default_provider: Arc<str>,
    /// Default model (falls back to the provider's default)
    default_model: Option<Arc<str>>,
    /// Event log for the audit trail
    event_log: EventLog,
}

impl FlowRunner {
    /// Create a runner with a default provider, model, and event log
    pub fn new(provider: &str, model: Option<&str>, event_log: EventLog) -> Self {
        Self {
            providers: Arc::new(DashMap::new()),
            default_provider: provider.into(),
            default_model: model.map(Into::into),
            event_log,
        }
    }

    /// Register a provider instance under its own name.
    ///
    /// Lets tests inject a configured [`MockProvider`] (or any fake)
    /// instead of going through the factory.
    ///
    /// [`MockProvider`]: crate::provider::MockProvider
    pub fn register(&self, provider: Arc<dyn ModelProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Get or create a cached provider (atomic via DashMap entry API)
    fn get_provider(&self, name: &str) -> Result<Arc<dyn ModelProvider>, AisleError> {
        use dashmap::mapref::entry::Entry;

        match self.providers.entry(name.to_string()) {
            Entry::Occupied(e) => Ok(Arc::clone(e.get())),
            Entry::Vacant(e) => {
                let provider: Arc<dyn ModelProvider> = Arc::from(
                    create_provider(name).map_err(|e| AisleError::Provider(e.to_string()))?,
                );
                e.insert(Arc::clone(&provider));
                Ok(provider)
            }
        }
    }

    /// Run one request/response cycle for the given flow.
    #[instrument(skip(self, flow, input), fields(flow = flow.name))]
    pub async fn invoke<I, O>(&self, flow: &FlowDef<I, O>, input: I) -> Result<O, AisleError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let started = Instant::now();
        let flow_name: Arc<str> = Arc::from(flow.name);

        let value = serde_json::to_value(&input).map_err(|e| AisleError::InputEncode {
            flow: flow.name.to_string(),
            details: e.to_string(),
        })?;

        self.event_log.emit(EventKind::FlowStarted {
            flow: Arc::clone(&flow_name),
            input: value.clone(),
        });

        match self.invoke_inner(flow, &flow_name, &value).await {
            Ok((output, raw)) => {
                self.event_log.emit(EventKind::FlowCompleted {
                    flow: flow_name,
                    output: raw,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                Ok(output)
            }
            Err(e) => {
                self.event_log.emit(EventKind::FlowFailed {
                    flow: flow_name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn invoke_inner<I, O>(
        &self,
        flow: &FlowDef<I, O>,
        flow_name: &Arc<str>,
        value: &Value,
    ) -> Result<(O, Value), AisleError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        flow.validate_input(value)?;

        let prompt = flow.template.render(value);
        self.event_log.emit(EventKind::TemplateRendered {
            flow: Arc::clone(flow_name),
            prompt: prompt.clone(),
        });

        let provider = self.get_provider(&self.default_provider)?;
        let model = self
            .default_model
            .as_deref()
            .unwrap_or_else(|| provider.default_model())
            .to_string();

        let mut request = GenerateRequest::new(prompt, model.clone())
            .with_output_schema(flow.output_schema.to_json_schema());
        if let Some(system_prompt) = flow.system_prompt {
            request = request.with_system_prompt(system_prompt);
        }

        debug!(provider = %provider.name(), model = %model, "Dispatching flow");
        self.event_log.emit(EventKind::ProviderCalled {
            flow: Arc::clone(flow_name),
            provider: provider.name().to_string(),
            model,
            prompt_len: request.prompt.len(),
        });

        let response = provider
            .generate(request)
            .await
            .map_err(|e| AisleError::Provider(e.to_string()))?;

        self.event_log.emit(EventKind::ProviderResponded {
            flow: Arc::clone(flow_name),
            output_len: response.content.len(),
            tokens_used: Some(response.usage.total_tokens),
        });

        flow.parse_output(&response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    struct EchoInput {
        text: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct EchoOutput {
        echo: String,
    }

    fn echo_flow() -> FlowDef<EchoInput, EchoOutput> {
        FlowDef::new(
            "echo",
            Schema::new(vec![FieldSpec::required(
                "text",
                FieldType::Str { min_len: 1 },
                "Text to echo.",
            )]),
            "Echo this: {{text}}",
            Schema::new(vec![FieldSpec::required(
                "echo",
                FieldType::Str { min_len: 1 },
                "The echoed text.",
            )]),
        )
        .unwrap()
    }

    #[test]
    fn definition_rejects_undeclared_slot() {
        let result: Result<FlowDef<EchoInput, EchoOutput>, _> = FlowDef::new(
            "echo",
            Schema::new(vec![FieldSpec::required(
                "text",
                FieldType::Str { min_len: 1 },
                "Text.",
            )]),
            "Echo this: {{txet}}",
            Schema::new(vec![]),
        );
        assert!(matches!(result, Err(AisleError::UnknownSlot { .. })));
    }

    #[test]
    fn parse_output_distinguishes_failure_kinds() {
        let flow = echo_flow();

        assert!(matches!(
            flow.parse_output("   "),
            Err(AisleError::EmptyResponse { .. })
        ));
        assert!(matches!(
            flow.parse_output("not json at all"),
            Err(AisleError::InvalidJson { .. })
        ));
        assert!(matches!(
            flow.parse_output(r#"{"echo": 7}"#),
            Err(AisleError::SchemaFailed { .. })
        ));
        assert!(matches!(
            flow.parse_output(r#"{"wrong": "field"}"#),
            Err(AisleError::SchemaFailed { .. })
        ));
    }

    #[test]
    fn parse_output_accepts_conforming_reply() {
        let flow = echo_flow();
        let (output, raw) = flow.parse_output(r#"{"echo": "hello"}"#).unwrap();
        assert_eq!(output, EchoOutput { echo: "hello".to_string() });
        assert_eq!(raw, json!({ "echo": "hello" }));
    }

    #[test]
    fn parse_output_rejects_extra_fields() {
        let flow = echo_flow();
        assert!(matches!(
            flow.parse_output(r#"{"echo": "hello", "extra": 1}"#),
            Err(AisleError::SchemaFailed { .. })
        ));
    }

    #[test]
    fn postcondition_runs_after_field_checks() {
        let flow = echo_flow().with_postcondition(|value| {
            if value["echo"] == "forbidden" {
                Err("echo must not be 'forbidden'".to_string())
            } else {
                Ok(())
            }
        });

        assert!(flow.parse_output(r#"{"echo": "fine"}"#).is_ok());
        assert!(matches!(
            flow.parse_output(r#"{"echo": "forbidden"}"#),
            Err(AisleError::SchemaFailed { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_provider_is_a_transport_error() {
        let runner = FlowRunner::new("no-such-provider", None, EventLog::new());
        let err = runner
            .invoke(&echo_flow(), EchoInput { text: "hi".to_string() })
            .await
            .unwrap_err();
        assert!(err.is_transport_error());
    }
}
