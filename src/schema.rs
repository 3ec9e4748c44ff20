//! Typed schema descriptions and the generic validator
//!
//! A [`Schema`] is an explicit data structure describing the fields of a
//! flow's input or output: name, primitive type, constraint, optionality.
//! A single interpreter walks the description against a `serde_json::Value`
//! and returns either success or a list of field-level [`Violation`]s.
//! Validation is pure and total: it never panics for well-formed specs.
//!
//! The same description renders to a JSON Schema object via
//! [`Schema::to_json_schema`], which is what providers receive alongside
//! the prompt and what the flow wrapper compiles for reply checking.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse an ISO-8601 calendar date (YYYY-MM-DD)
///
/// Strict: components must be zero-padded and form a real calendar date,
/// so "2024-6-1" and "2024-02-31" are both rejected.
pub fn parse_iso_date(s: &str) -> Result<Date, String> {
    Date::parse(s, DATE_FORMAT).map_err(|e| e.to_string())
}

/// Primitive field types with their constraints
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// UTF-8 string with a minimum length in characters
    Str { min_len: usize },
    /// Integer constrained to a closed interval
    Int { min: i64, max: i64 },
    Bool,
    /// ISO-8601 calendar date string (YYYY-MM-DD)
    Date,
    /// List of strings with a maximum length
    StrList { max_items: usize },
}

impl FieldType {
    fn json_type(&self) -> &'static str {
        match self {
            FieldType::Str { .. } | FieldType::Date => "string",
            FieldType::Int { .. } => "integer",
            FieldType::Bool => "boolean",
            FieldType::StrList { .. } => "array",
        }
    }

    /// Render this type as a JSON Schema fragment.
    ///
    /// Optional fields are nullable: `null` and absent both mean
    /// "not provided".
    fn to_json_schema(&self, description: &str, required: bool) -> Value {
        let ty: Value = if required {
            json!(self.json_type())
        } else {
            json!([self.json_type(), "null"])
        };

        let mut fragment = match self {
            FieldType::Str { min_len } => json!({
                "type": ty,
                "minLength": min_len,
                "description": description,
            }),
            FieldType::Int { min, max } => json!({
                "type": ty,
                "minimum": min,
                "maximum": max,
                "description": description,
            }),
            FieldType::Bool => json!({
                "type": ty,
                "description": description,
            }),
            FieldType::Date => json!({
                "type": ty,
                "description": format!("{} ISO-8601 date (YYYY-MM-DD).", description),
            }),
            FieldType::StrList { max_items } => json!({
                "type": ty,
                "items": { "type": "string" },
                "maxItems": max_items,
                "description": description,
            }),
        };

        // minLength on a nullable string would reject null under some
        // draft interpretations; the interpreter enforces it regardless.
        if !required {
            if let Some(obj) = fragment.as_object_mut() {
                obj.remove("minLength");
            }
        }
        fragment
    }
}

/// One field of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            description,
        }
    }
}

/// A single field-level constraint violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    NotAnObject,
    MissingRequired,
    TypeMismatch { expected: &'static str },
    TooShort { min_len: usize },
    OutOfRange { min: i64, max: i64 },
    TooManyItems { max_items: usize },
    InvalidDate { details: String },
    UnknownField,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::NotAnObject => write!(f, "value is not a JSON object"),
            ViolationKind::MissingRequired => {
                write!(f, "missing required field '{}'", self.field)
            }
            ViolationKind::TypeMismatch { expected } => {
                write!(f, "field '{}' must be a {}", self.field, expected)
            }
            ViolationKind::TooShort { min_len } => write!(
                f,
                "field '{}' must be at least {} character(s)",
                self.field, min_len
            ),
            ViolationKind::OutOfRange { min, max } => write!(
                f,
                "field '{}' must be between {} and {}",
                self.field, min, max
            ),
            ViolationKind::TooManyItems { max_items } => write!(
                f,
                "field '{}' must have at most {} item(s)",
                self.field, max_items
            ),
            ViolationKind::InvalidDate { details } => write!(
                f,
                "field '{}' is not a valid ISO-8601 date: {}",
                self.field, details
            ),
            ViolationKind::UnknownField => write!(f, "unknown field '{}'", self.field),
        }
    }
}

/// Declarative shape description interpreted by [`Schema::validate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a raw value against this schema.
    ///
    /// `null` on an optional field means "not provided" and passes; `null`
    /// on a required field is a missing-field violation. Fields not
    /// declared by the schema are violations.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let Some(obj) = value.as_object() else {
            return Err(vec![Violation {
                field: String::new(),
                kind: ViolationKind::NotAnObject,
            }]);
        };

        let mut violations = Vec::new();

        for spec in &self.fields {
            match obj.get(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        violations.push(Violation {
                            field: spec.name.to_string(),
                            kind: ViolationKind::MissingRequired,
                        });
                    }
                }
                Some(v) => check_field(spec, v, &mut violations),
            }
        }

        for key in obj.keys() {
            if self.field(key).is_none() {
                violations.push(Violation {
                    field: key.clone(),
                    kind: ViolationKind::UnknownField,
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Render the schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.fields {
            properties.insert(
                spec.name.to_string(),
                spec.ty.to_json_schema(spec.description, spec.required),
            );
            if spec.required {
                required.push(Value::String(spec.name.to_string()));
            }
        }

        json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": required,
            "additionalProperties": false,
        })
    }
}

fn check_field(spec: &FieldSpec, value: &Value, violations: &mut Vec<Violation>) {
    let field = spec.name.to_string();
    match &spec.ty {
        FieldType::Str { min_len } => match value.as_str() {
            Some(s) => {
                if s.chars().count() < *min_len {
                    violations.push(Violation {
                        field,
                        kind: ViolationKind::TooShort { min_len: *min_len },
                    });
                }
            }
            None => violations.push(Violation {
                field,
                kind: ViolationKind::TypeMismatch { expected: "string" },
            }),
        },
        FieldType::Int { min, max } => match value.as_i64() {
            // as_i64 is None for floats with a fractional part, so 72.5
            // is a type mismatch rather than a truncated 72.
            Some(n) => {
                if n < *min || n > *max {
                    violations.push(Violation {
                        field,
                        kind: ViolationKind::OutOfRange {
                            min: *min,
                            max: *max,
                        },
                    });
                }
            }
            None => violations.push(Violation {
                field,
                kind: ViolationKind::TypeMismatch {
                    expected: "integer",
                },
            }),
        },
        FieldType::Bool => {
            if !value.is_boolean() {
                violations.push(Violation {
                    field,
                    kind: ViolationKind::TypeMismatch {
                        expected: "boolean",
                    },
                });
            }
        }
        FieldType::Date => match value.as_str() {
            Some(s) => {
                if let Err(details) = parse_iso_date(s) {
                    violations.push(Violation {
                        field,
                        kind: ViolationKind::InvalidDate { details },
                    });
                }
            }
            None => violations.push(Violation {
                field,
                kind: ViolationKind::TypeMismatch { expected: "string" },
            }),
        },
        FieldType::StrList { max_items } => match value.as_array() {
            Some(items) => {
                if items.len() > *max_items {
                    violations.push(Violation {
                        field: field.clone(),
                        kind: ViolationKind::TooManyItems {
                            max_items: *max_items,
                        },
                    });
                }
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        violations.push(Violation {
                            field: format!("{}[{}]", spec.name, i),
                            kind: ViolationKind::TypeMismatch { expected: "string" },
                        });
                    }
                }
            }
            None => violations.push(Violation {
                field,
                kind: ViolationKind::TypeMismatch { expected: "array" },
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn popularity_output_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::required(
                "popularityScore",
                FieldType::Int { min: 0, max: 100 },
                "Popularity score.",
            ),
            FieldSpec::required("analysis", FieldType::Str { min_len: 1 }, "Analysis."),
        ])
    }

    fn availability_output_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::required("isAvailable", FieldType::Bool, "Availability."),
            FieldSpec::optional("estimatedRestockDate", FieldType::Date, "Restock date."),
            FieldSpec::optional(
                "alternativeProducts",
                FieldType::StrList { max_items: 3 },
                "Alternatives.",
            ),
        ])
    }

    #[test]
    fn valid_object_passes() {
        let schema = popularity_output_schema();
        let value = json!({ "popularityScore": 87, "analysis": "Selling fast." });
        assert!(schema.validate(&value).is_ok());
    }

    #[test]
    fn non_object_is_rejected() {
        let schema = popularity_output_schema();
        let err = schema.validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err[0].kind, ViolationKind::NotAnObject);
    }

    #[test]
    fn missing_required_field() {
        let schema = popularity_output_schema();
        let err = schema.validate(&json!({ "analysis": "..." })).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].field, "popularityScore");
        assert_eq!(err[0].kind, ViolationKind::MissingRequired);
    }

    #[test]
    fn null_required_field_counts_as_missing() {
        let schema = popularity_output_schema();
        let err = schema
            .validate(&json!({ "popularityScore": null, "analysis": "..." }))
            .unwrap_err();
        assert_eq!(err[0].kind, ViolationKind::MissingRequired);
    }

    #[test]
    fn out_of_range_score_rejected_not_clamped() {
        let schema = popularity_output_schema();
        let err = schema
            .validate(&json!({ "popularityScore": 150, "analysis": "..." }))
            .unwrap_err();
        assert_eq!(err[0].kind, ViolationKind::OutOfRange { min: 0, max: 100 });
    }

    #[test]
    fn fractional_score_is_type_mismatch() {
        let schema = popularity_output_schema();
        let err = schema
            .validate(&json!({ "popularityScore": 72.5, "analysis": "..." }))
            .unwrap_err();
        assert_eq!(
            err[0].kind,
            ViolationKind::TypeMismatch { expected: "integer" }
        );
    }

    #[test]
    fn empty_string_violates_min_len() {
        let schema = popularity_output_schema();
        let err = schema
            .validate(&json!({ "popularityScore": 50, "analysis": "" }))
            .unwrap_err();
        assert_eq!(err[0].kind, ViolationKind::TooShort { min_len: 1 });
    }

    #[test]
    fn unknown_field_rejected() {
        let schema = popularity_output_schema();
        let err = schema
            .validate(&json!({
                "popularityScore": 50,
                "analysis": "ok",
                "confidence": 0.9,
            }))
            .unwrap_err();
        assert_eq!(err[0].field, "confidence");
        assert_eq!(err[0].kind, ViolationKind::UnknownField);
    }

    #[test]
    fn optional_fields_may_be_absent_or_null() {
        let schema = availability_output_schema();
        assert!(schema.validate(&json!({ "isAvailable": true })).is_ok());
        assert!(schema
            .validate(&json!({ "isAvailable": false, "estimatedRestockDate": null }))
            .is_ok());
    }

    #[test]
    fn calendar_validity_is_enforced() {
        let schema = availability_output_schema();
        assert!(schema
            .validate(&json!({ "isAvailable": false, "estimatedRestockDate": "2024-06-01" }))
            .is_ok());

        for bad in ["2024-02-31", "2024-6-1", "June 1st", "2024-06-01T10:00"] {
            let err = schema
                .validate(&json!({ "isAvailable": false, "estimatedRestockDate": bad }))
                .unwrap_err();
            assert!(
                matches!(err[0].kind, ViolationKind::InvalidDate { .. }),
                "expected InvalidDate for {:?}, got {:?}",
                bad,
                err[0].kind
            );
        }
    }

    #[test]
    fn alternatives_capped_at_three() {
        let schema = availability_output_schema();
        assert!(schema
            .validate(&json!({
                "isAvailable": false,
                "alternativeProducts": ["A", "B", "C"],
            }))
            .is_ok());

        let err = schema
            .validate(&json!({
                "isAvailable": false,
                "alternativeProducts": ["A", "B", "C", "D"],
            }))
            .unwrap_err();
        assert_eq!(err[0].kind, ViolationKind::TooManyItems { max_items: 3 });
    }

    #[test]
    fn list_elements_must_be_strings() {
        let schema = availability_output_schema();
        let err = schema
            .validate(&json!({
                "isAvailable": false,
                "alternativeProducts": ["A", 2],
            }))
            .unwrap_err();
        assert_eq!(err[0].field, "alternativeProducts[1]");
    }

    #[test]
    fn json_schema_shape() {
        let schema = availability_output_schema();
        let js = schema.to_json_schema();

        assert_eq!(js["type"], "object");
        assert_eq!(js["additionalProperties"], false);
        assert_eq!(js["required"], json!(["isAvailable"]));
        assert_eq!(js["properties"]["isAvailable"]["type"], "boolean");
        // Optional fields are nullable
        assert_eq!(
            js["properties"]["estimatedRestockDate"]["type"],
            json!(["string", "null"])
        );
        assert_eq!(js["properties"]["alternativeProducts"]["maxItems"], 3);
    }

    #[test]
    fn json_schema_carries_numeric_bounds() {
        let js = popularity_output_schema().to_json_schema();
        assert_eq!(js["properties"]["popularityScore"]["minimum"], 0);
        assert_eq!(js["properties"]["popularityScore"]["maximum"], 100);
    }

    #[test]
    fn parse_iso_date_accepts_real_dates() {
        assert!(parse_iso_date("2024-06-01").is_ok());
        assert!(parse_iso_date("2024-02-29").is_ok()); // leap year
        assert!(parse_iso_date("2023-02-29").is_err());
    }
}
