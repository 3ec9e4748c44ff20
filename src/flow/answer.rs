//! answer-question flow
//!
//! Answers a user question about a product.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::AisleError;
use crate::flow::{FlowDef, FlowRunner};
use crate::schema::{FieldSpec, FieldType, Schema};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuestionInput {
    pub product_name: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuestionOutput {
    pub answer: String,
}

const SYSTEM_PROMPT: &str = "You are a customer support chatbot for an e-commerce website.";

const PROMPT: &str = "\
You are answering a question about a product. Answer the question as accurately and concisely as possible.

Product Name: {{productName}}
Question: {{question}}
Answer:";

pub static ANSWER_QUESTION: Lazy<FlowDef<AnswerQuestionInput, AnswerQuestionOutput>> =
    Lazy::new(|| {
        FlowDef::new(
            "answer-question",
            Schema::new(vec![
                FieldSpec::required(
                    "productName",
                    FieldType::Str { min_len: 1 },
                    "The name of the product.",
                ),
                FieldSpec::required(
                    "question",
                    FieldType::Str { min_len: 1 },
                    "The question about the product.",
                ),
            ]),
            PROMPT,
            Schema::new(vec![FieldSpec::required(
                "answer",
                FieldType::Str { min_len: 1 },
                "The answer to the question about the product.",
            )]),
        )
        .expect("answer-question flow definition is valid")
        .with_system_prompt(SYSTEM_PROMPT)
    });

/// Answer a question about a product.
pub async fn answer_question(
    runner: &FlowRunner,
    input: AnswerQuestionInput,
) -> Result<AnswerQuestionOutput, AisleError> {
    runner.invoke(&ANSWER_QUESTION, input).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_slots_match_input_fields() {
        let slots: Vec<_> = ANSWER_QUESTION.template().slots().collect();
        assert_eq!(slots, vec!["productName", "question"]);
    }

    #[test]
    fn input_serializes_to_camel_case() {
        let input = AnswerQuestionInput {
            product_name: "Widget".to_string(),
            question: "Is it waterproof?".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({ "productName": "Widget", "question": "Is it waterproof?" })
        );
    }

    #[test]
    fn blank_question_is_invalid() {
        let value = json!({ "productName": "Widget", "question": "" });
        assert!(ANSWER_QUESTION.validate_input(&value).is_err());
    }

    #[test]
    fn answer_must_be_non_empty() {
        assert!(ANSWER_QUESTION.parse_output(r#"{"answer": ""}"#).is_err());
        assert!(ANSWER_QUESTION
            .parse_output(r#"{"answer": "Yes, to one meter."}"#)
            .is_ok());
    }
}
