//! check-availability flow
//!
//! Checks whether a product is in stock and, if not, estimates a restock
//! date and suggests up to three alternatives. `null` and absent both
//! mean "not provided" for the optional fields; a restock date on an
//! available product is a contract violation.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AisleError;
use crate::flow::{FlowDef, FlowRunner};
use crate::schema::{FieldSpec, FieldType, Schema};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityInput {
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityOutput {
    pub is_available: bool,
    /// ISO-8601 date; `None` when available or never restocking
    #[serde(default)]
    pub estimated_restock_date: Option<String>,
    /// Up to 3 suggested substitutes
    #[serde(default)]
    pub alternative_products: Option<Vec<String>>,
}

const SYSTEM_PROMPT: &str = "You are a customer support chatbot for an e-commerce store. \
A customer wants to know if a product is available and when it will be restocked if it is unavailable.";

const PROMPT: &str = "\
Respond to the customer based on the following product name:
Product Name: {{productName}}

Determine if the product is available. If it is, set isAvailable to true and do not set estimatedRestockDate. If it is not, set isAvailable to false and provide an estimated restock date in ISO 8601 format (YYYY-MM-DD). If the product will never be available again, return null for estimatedRestockDate.
Also provide up to 3 alternative products in the alternativeProducts field.
Consider if there are alternative products that may work instead if the product requested isn't available.";

/// An available product must not carry a restock date.
fn restock_only_when_unavailable(value: &Value) -> Result<(), String> {
    let is_available = value
        .get("isAvailable")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let has_restock_date = value
        .get("estimatedRestockDate")
        .map(|v| !v.is_null())
        .unwrap_or(false);

    if is_available && has_restock_date {
        return Err(
            "estimatedRestockDate must be absent when isAvailable is true".to_string(),
        );
    }
    Ok(())
}

pub static CHECK_AVAILABILITY: Lazy<FlowDef<CheckAvailabilityInput, CheckAvailabilityOutput>> =
    Lazy::new(|| {
        FlowDef::new(
            "check-availability",
            Schema::new(vec![FieldSpec::required(
                "productName",
                FieldType::Str { min_len: 1 },
                "The name of the product to check availability for.",
            )]),
            PROMPT,
            Schema::new(vec![
                FieldSpec::required(
                    "isAvailable",
                    FieldType::Bool,
                    "Whether the product is currently available.",
                ),
                FieldSpec::optional(
                    "estimatedRestockDate",
                    FieldType::Date,
                    "The estimated date when the product will be restocked if not available.",
                ),
                FieldSpec::optional(
                    "alternativeProducts",
                    FieldType::StrList { max_items: 3 },
                    "If product is unavailable provide a list of alternative products the user can buy instead.",
                ),
            ]),
        )
        .expect("check-availability flow definition is valid")
        .with_system_prompt(SYSTEM_PROMPT)
        .with_postcondition(restock_only_when_unavailable)
    });

/// Check the availability of a product.
pub async fn check_availability(
    runner: &FlowRunner,
    input: CheckAvailabilityInput,
) -> Result<CheckAvailabilityOutput, AisleError> {
    runner.invoke(&CHECK_AVAILABILITY, input).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_slots_match_input_fields() {
        let slots: Vec<_> = CHECK_AVAILABILITY.template().slots().collect();
        assert_eq!(slots, vec!["productName"]);
    }

    #[test]
    fn unavailable_with_restock_and_alternatives() {
        let (output, _) = CHECK_AVAILABILITY
            .parse_output(
                r#"{
                    "isAvailable": false,
                    "estimatedRestockDate": "2024-06-01",
                    "alternativeProducts": ["Gizmo", "Doohickey"]
                }"#,
            )
            .unwrap();
        assert!(!output.is_available);
        assert_eq!(output.estimated_restock_date.as_deref(), Some("2024-06-01"));
        assert_eq!(
            output.alternative_products,
            Some(vec!["Gizmo".to_string(), "Doohickey".to_string()])
        );
    }

    #[test]
    fn null_restock_date_means_never_restocking() {
        let (output, _) = CHECK_AVAILABILITY
            .parse_output(r#"{"isAvailable": false, "estimatedRestockDate": null}"#)
            .unwrap();
        assert!(output.estimated_restock_date.is_none());
    }

    #[test]
    fn available_must_not_carry_restock_date() {
        assert!(CHECK_AVAILABILITY
            .parse_output(r#"{"isAvailable": true, "estimatedRestockDate": "2024-06-01"}"#)
            .is_err());
        assert!(CHECK_AVAILABILITY
            .parse_output(r#"{"isAvailable": true}"#)
            .is_ok());
    }

    #[test]
    fn invalid_calendar_date_rejected() {
        assert!(CHECK_AVAILABILITY
            .parse_output(r#"{"isAvailable": false, "estimatedRestockDate": "2024-02-31"}"#)
            .is_err());
    }

    #[test]
    fn more_than_three_alternatives_rejected() {
        assert!(CHECK_AVAILABILITY
            .parse_output(
                r#"{"isAvailable": false, "alternativeProducts": ["A", "B", "C", "D"]}"#,
            )
            .is_err());
    }
}
