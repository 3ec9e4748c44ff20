//! assess-popularity flow
//!
//! Scores a product's popularity from recent purchase data. The prompt
//! asks the model to stay within 0-100, and the output schema enforces
//! it independently: an out-of-range score is rejected, never clamped.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::AisleError;
use crate::flow::{FlowDef, FlowRunner};
use crate::schema::{FieldSpec, FieldType, Schema};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessPopularityInput {
    pub product_name: String,
    pub recent_purchase_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessPopularityOutput {
    pub popularity_score: i64,
    pub analysis: String,
}

const SYSTEM_PROMPT: &str = "You are an expert in product popularity analysis.";

const PROMPT: &str = "\
You will analyze the recent purchase data for a given product and determine its popularity based on the provided information.

Product Name: {{productName}}
Recent Purchase Data: {{recentPurchaseData}}

Based on this data, provide a popularity score (a number between 0 and 100) and a qualitative analysis explaining the product's popularity or lack thereof.

Ensure that the popularity score is an integer between 0 and 100. Do not omit the popularity score.";

pub static ASSESS_POPULARITY: Lazy<FlowDef<AssessPopularityInput, AssessPopularityOutput>> =
    Lazy::new(|| {
        FlowDef::new(
            "assess-popularity",
            Schema::new(vec![
                FieldSpec::required(
                    "productName",
                    FieldType::Str { min_len: 1 },
                    "The name of the product to assess.",
                ),
                FieldSpec::required(
                    "recentPurchaseData",
                    FieldType::Str { min_len: 1 },
                    "Data about recent purchases of the product, including timestamps and quantities.",
                ),
            ]),
            PROMPT,
            Schema::new(vec![
                FieldSpec::required(
                    "popularityScore",
                    FieldType::Int { min: 0, max: 100 },
                    "A numerical score representing the popularity of the product, with higher scores indicating greater popularity.",
                ),
                FieldSpec::required(
                    "analysis",
                    FieldType::Str { min_len: 1 },
                    "A qualitative analysis of the product popularity, including reasons for its popularity or lack thereof.",
                ),
            ]),
        )
        .expect("assess-popularity flow definition is valid")
        .with_system_prompt(SYSTEM_PROMPT)
    });

/// Assess the popularity of a product from recent purchase data.
pub async fn assess_popularity(
    runner: &FlowRunner,
    input: AssessPopularityInput,
) -> Result<AssessPopularityOutput, AisleError> {
    runner.invoke(&ASSESS_POPULARITY, input).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_slots_match_input_fields() {
        let slots: Vec<_> = ASSESS_POPULARITY.template().slots().collect();
        assert_eq!(slots, vec!["productName", "recentPurchaseData"]);
    }

    #[test]
    fn score_range_is_enforced_not_trusted() {
        for raw in [
            r#"{"popularityScore": 150, "analysis": "too hot"}"#,
            r#"{"popularityScore": -1, "analysis": "too cold"}"#,
            r#"{"popularityScore": 72.5, "analysis": "not an integer"}"#,
        ] {
            assert!(
                ASSESS_POPULARITY.parse_output(raw).is_err(),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn boundary_scores_are_valid() {
        for raw in [
            r#"{"popularityScore": 0, "analysis": "nobody buys it"}"#,
            r#"{"popularityScore": 100, "analysis": "flying off shelves"}"#,
        ] {
            let (output, _) = ASSESS_POPULARITY.parse_output(raw).unwrap();
            assert!((0..=100).contains(&output.popularity_score));
        }
    }

    #[test]
    fn missing_score_is_rejected() {
        assert!(ASSESS_POPULARITY
            .parse_output(r#"{"analysis": "no score given"}"#)
            .is_err());
    }
}
