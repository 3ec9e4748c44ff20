//! Error types with fix suggestions

use crate::schema::Violation;
use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum AisleError {
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Input errors (AISLE-010 to AISLE-011)
    // ─────────────────────────────────────────────────────────────
    #[error("AISLE-010: Invalid input for flow '{flow}': {}", format_violations(.violations))]
    InvalidInput {
        flow: String,
        violations: Vec<Violation>,
    },

    #[error("AISLE-011: Input for flow '{flow}' could not be serialized: {details}")]
    InputEncode { flow: String, details: String },

    // ─────────────────────────────────────────────────────────────
    // Template errors (AISLE-020 to AISLE-021)
    // ─────────────────────────────────────────────────────────────
    #[error("AISLE-020: Template parse error at position {position}: {details}")]
    TemplateParse { position: usize, details: String },

    #[error("AISLE-021: Template slot '{{{{{slot}}}}}' does not name a declared input field")]
    UnknownSlot { slot: String },

    // ─────────────────────────────────────────────────────────────
    // Transport errors (AISLE-030)
    // ─────────────────────────────────────────────────────────────
    #[error("AISLE-030: Provider error: {0}")]
    Provider(String),

    // ─────────────────────────────────────────────────────────────
    // Output errors (AISLE-040 to AISLE-042)
    // ─────────────────────────────────────────────────────────────
    #[error("AISLE-040: Model response for flow '{flow}' is not valid JSON: {details}")]
    InvalidJson { flow: String, details: String },

    #[error("AISLE-041: Model response for flow '{flow}' does not conform to the output schema: {details}")]
    SchemaFailed { flow: String, details: String },

    #[error("AISLE-042: Model returned an empty response for flow '{flow}'")]
    EmptyResponse { flow: String },
}

impl AisleError {
    /// Raised before any external call; fixed by correcting the input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::InputEncode { .. }
        )
    }

    /// The external call could not complete (network, auth, quota).
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    /// The external call completed but the reply is unusable.
    pub fn is_output_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidJson { .. } | Self::SchemaFailed { .. } | Self::EmptyResponse { .. }
        )
    }
}

impl FixSuggestion for AisleError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            AisleError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            AisleError::Json(_) => Some("Check the value serializes to plain JSON"),
            AisleError::Io(_) => Some("Check file path and permissions"),
            AisleError::InvalidInput { .. } => {
                Some("Correct the listed fields and submit again")
            }
            AisleError::InputEncode { .. } => {
                Some("Input must serialize to a JSON object of primitive fields")
            }
            AisleError::TemplateParse { .. } => {
                Some("Check template syntax: slots are written {{fieldName}}")
            }
            AisleError::UnknownSlot { .. } => {
                Some("Every template slot must name a field declared in the input schema")
            }
            AisleError::Provider(_) => {
                Some("Check the provider name and that its API key env var is set (ANTHROPIC_API_KEY or OPENAI_API_KEY)")
            }
            AisleError::InvalidJson { .. } => {
                Some("The model must reply with a single JSON object; retry the request")
            }
            AisleError::SchemaFailed { .. } => {
                Some("The model reply violated the declared output schema; retry the request")
            }
            AisleError::EmptyResponse { .. } => {
                Some("The model returned nothing; retry the request")
            }
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ViolationKind;

    fn sample_input_error() -> AisleError {
        AisleError::InvalidInput {
            flow: "answer-question".to_string(),
            violations: vec![
                Violation {
                    field: "question".to_string(),
                    kind: ViolationKind::MissingRequired,
                },
                Violation {
                    field: "productName".to_string(),
                    kind: ViolationKind::TooShort { min_len: 1 },
                },
            ],
        }
    }

    #[test]
    fn input_error_lists_all_violations() {
        let msg = sample_input_error().to_string();
        assert!(msg.starts_with("AISLE-010"));
        assert!(msg.contains("question"));
        assert!(msg.contains("productName"));
    }

    #[test]
    fn classification_helpers_are_disjoint() {
        let input = sample_input_error();
        let transport = AisleError::Provider("connection refused".to_string());
        let output = AisleError::SchemaFailed {
            flow: "assess-popularity".to_string(),
            details: "popularityScore out of range".to_string(),
        };

        assert!(input.is_input_error());
        assert!(!input.is_transport_error());
        assert!(!input.is_output_error());

        assert!(transport.is_transport_error());
        assert!(!transport.is_input_error());
        assert!(!transport.is_output_error());

        assert!(output.is_output_error());
        assert!(!output.is_input_error());
        assert!(!output.is_transport_error());
    }

    #[test]
    fn every_variant_has_a_fix_suggestion() {
        let errors = vec![
            sample_input_error(),
            AisleError::Provider("quota".to_string()),
            AisleError::InvalidJson {
                flow: "f".to_string(),
                details: "d".to_string(),
            },
            AisleError::EmptyResponse {
                flow: "f".to_string(),
            },
            AisleError::UnknownSlot {
                slot: "productNam".to_string(),
            },
        ];
        for e in errors {
            assert!(e.fix_suggestion().is_some(), "no suggestion for {}", e);
        }
    }

    #[test]
    fn unknown_slot_renders_braces() {
        let e = AisleError::UnknownSlot {
            slot: "productNam".to_string(),
        };
        assert!(e.to_string().contains("{{productNam}}"));
    }
}
