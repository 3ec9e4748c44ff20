//! Prompt templates with construction-time slot checking
//!
//! A template is parsed once into Literal/Slot tokens; every `{{slot}}`
//! must name a field declared by the flow's input schema, so a template
//! referencing an undeclared field is rejected when the flow is defined,
//! not when a user submits. Rendering is deterministic: the same input
//! value produces a byte-identical prompt.

use crate::error::AisleError;
use crate::schema::Schema;
use serde_json::Value;
use std::ops::Range;

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Literal text (range into the original string)
    Literal(Range<usize>),
    /// Interpolation slot: {{fieldName}}
    Slot(String),
}

/// A parsed prompt template bound to an input schema
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
    tokens: Vec<Token>,
}

impl PromptTemplate {
    /// Parse a template and verify every slot against the input schema.
    pub fn parse(text: impl Into<String>, input_schema: &Schema) -> Result<Self, AisleError> {
        let text = text.into();
        let tokens = tokenize(&text)?;

        for token in &tokens {
            if let Token::Slot(name) = token {
                if input_schema.field(name).is_none() {
                    return Err(AisleError::UnknownSlot { slot: name.clone() });
                }
            }
        }

        Ok(Self { text, tokens })
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Slot names in order of appearance (duplicates preserved).
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Slot(name) => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }

    /// Render the template against a validated input object.
    ///
    /// Slots substitute the field's string representation. A slot whose
    /// field is absent from the value keeps its original `{{name}}` text;
    /// input validation runs before rendering, so that only happens for
    /// optional fields left unset.
    pub fn render(&self, input: &Value) -> String {
        let mut out = String::with_capacity(self.text.len() * 2);

        for token in &self.tokens {
            match token {
                Token::Literal(range) => out.push_str(&self.text[range.clone()]),
                Token::Slot(name) => match input.get(name.as_str()) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(Value::Number(n)) => out.push_str(&n.to_string()),
                    Some(Value::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
                    _ => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                },
            }
        }

        out
    }
}

/// Single-pass tokenizer for `{{slot}}` templates
fn tokenize(text: &str) -> Result<Vec<Token>, AisleError> {
    let mut tokens = Vec::new();
    let mut cursor = 0usize;

    while let Some(rel) = text[cursor..].find("{{") {
        let open = cursor + rel;
        if open > cursor {
            tokens.push(Token::Literal(cursor..open));
        }

        let body_start = open + 2;
        let rel_close =
            text[body_start..]
                .find("}}")
                .ok_or_else(|| AisleError::TemplateParse {
                    position: open,
                    details: "unterminated '{{' slot".to_string(),
                })?;

        let raw = &text[body_start..body_start + rel_close];
        let name = raw.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AisleError::TemplateParse {
                position: open,
                details: format!("invalid slot name '{}'", raw),
            });
        }

        tokens.push(Token::Slot(name.to_string()));
        cursor = body_start + rel_close + 2;
    }

    if cursor < text.len() {
        tokens.push(Token::Literal(cursor..text.len()));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::required("productName", FieldType::Str { min_len: 1 }, "Product."),
            FieldSpec::required("question", FieldType::Str { min_len: 1 }, "Question."),
        ])
    }

    #[test]
    fn parse_literal_only() {
        let t = PromptTemplate::parse("plain text, no slots", &schema()).unwrap();
        assert_eq!(t.slots().count(), 0);
        assert_eq!(t.render(&json!({})), "plain text, no slots");
    }

    #[test]
    fn parse_and_render_slots() {
        let t = PromptTemplate::parse(
            "Product: {{productName}}\nQuestion: {{question}}",
            &schema(),
        )
        .unwrap();
        assert_eq!(t.slots().collect::<Vec<_>>(), vec!["productName", "question"]);

        let rendered = t.render(&json!({
            "productName": "Widget",
            "question": "Is it waterproof?",
        }));
        assert_eq!(rendered, "Product: Widget\nQuestion: Is it waterproof?");
    }

    #[test]
    fn rendering_is_deterministic() {
        let t = PromptTemplate::parse("{{productName}}: {{question}}", &schema()).unwrap();
        let input = json!({ "productName": "Widget", "question": "Why?" });
        assert_eq!(t.render(&input), t.render(&input));
    }

    #[test]
    fn undeclared_slot_rejected_at_parse() {
        let err = PromptTemplate::parse("Hello {{productNam}}", &schema()).unwrap_err();
        assert!(matches!(err, AisleError::UnknownSlot { slot } if slot == "productNam"));
    }

    #[test]
    fn unterminated_slot_rejected() {
        let err = PromptTemplate::parse("Hello {{productName", &schema()).unwrap_err();
        assert!(matches!(err, AisleError::TemplateParse { position: 6, .. }));
    }

    #[test]
    fn invalid_slot_name_rejected() {
        let err = PromptTemplate::parse("{{product name}}", &schema()).unwrap_err();
        assert!(matches!(err, AisleError::TemplateParse { .. }));
    }

    #[test]
    fn numbers_and_bools_render_unquoted() {
        let schema = Schema::new(vec![
            FieldSpec::required("count", FieldType::Int { min: 0, max: 100 }, "Count."),
            FieldSpec::required("urgent", FieldType::Bool, "Urgent."),
        ]);
        let t = PromptTemplate::parse("{{count}} items, urgent={{urgent}}", &schema).unwrap();
        assert_eq!(
            t.render(&json!({ "count": 7, "urgent": true })),
            "7 items, urgent=true"
        );
    }

    #[test]
    fn absent_field_keeps_placeholder() {
        let t = PromptTemplate::parse("Q: {{question}}", &schema()).unwrap();
        assert_eq!(t.render(&json!({})), "Q: {{question}}");
    }
}
