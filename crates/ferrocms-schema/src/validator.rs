//! JSON-Schema-like payload validator (§4.6: `ValidatePayload`,
//! `ValidatePartialPayload`, `ValidateSchema`).
//!
//! This is intentionally a subset of JSON Schema: `type`, `properties`,
//! `required`, and `items`, which is all the schema shapes content types and
//! block definitions are documented to carry. It is not a general-purpose
//! JSON Schema implementation.

use ferrocms_core::{Error, Result};
use serde_json::Value;

/// Whether required fields are enforced (`Strict`, used on publish) or
/// relaxed (`Partial`, used while a draft is being edited).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Strict,
    Partial,
}

/// Validates `schema` is itself well-formed: an object carrying a
/// recognized `type` and, for `type: object`, a `properties` object whose
/// values are themselves well-formed schemas.
pub fn validate_schema(schema: &Value) -> Result<()> {
    validate_schema_node(schema, "$")
}

fn validate_schema_node(node: &Value, path: &str) -> Result<()> {
    let obj = node
        .as_object()
        .ok_or_else(|| schema_invalid(path, "schema node must be an object"))?;

    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| schema_invalid(path, "schema node missing \"type\""))?;

    match ty {
        "object" => {
            if let Some(properties) = obj.get("properties") {
                let properties = properties
                    .as_object()
                    .ok_or_else(|| schema_invalid(path, "\"properties\" must be an object"))?;
                for (name, child) in properties {
                    validate_schema_node(child, &format!("{path}.{name}"))?;
                }
            }
            if let Some(required) = obj.get("required") {
                required
                    .as_array()
                    .ok_or_else(|| schema_invalid(path, "\"required\" must be an array"))?;
            }
        }
        "array" => {
            if let Some(items) = obj.get("items") {
                validate_schema_node(items, &format!("{path}[]"))?;
            }
        }
        "string" | "number" | "integer" | "boolean" => {}
        other => return Err(schema_invalid(path, &format!("unknown type {other:?}"))),
    }

    Ok(())
}

/// Validates `payload` against `schema` in strict mode: every declared
/// `required` field must be present at every level.
pub fn validate_payload(schema: &Value, payload: &Value) -> Result<()> {
    validate_node(schema, payload, "$", ValidationMode::Strict)
}

/// Validates `payload` against `schema` in draft mode: declared types are
/// still enforced, but missing required fields are allowed.
pub fn validate_partial_payload(schema: &Value, payload: &Value) -> Result<()> {
    validate_node(schema, payload, "$", ValidationMode::Partial)
}

fn validate_node(schema: &Value, payload: &Value, path: &str, mode: ValidationMode) -> Result<()> {
    let obj = schema
        .as_object()
        .ok_or_else(|| schema_invalid(path, "schema node must be an object"))?;
    let ty = obj.get("type").and_then(|v| v.as_str()).unwrap_or("object");

    match ty {
        "object" => {
            let payload_obj = payload
                .as_object()
                .ok_or_else(|| payload_invalid(path, "expected an object"))?;

            if mode == ValidationMode::Strict {
                if let Some(required) = obj.get("required").and_then(|v| v.as_array()) {
                    for field in required {
                        let field = field.as_str().unwrap_or_default();
                        if !payload_obj.contains_key(field) {
                            return Err(payload_invalid(
                                path,
                                &format!("missing required field {field:?}"),
                            ));
                        }
                    }
                }
            }

            if let Some(properties) = obj.get("properties").and_then(|v| v.as_object()) {
                for (name, child_schema) in properties {
                    if let Some(child_payload) = payload_obj.get(name) {
                        validate_node(child_schema, child_payload, &format!("{path}.{name}"), mode)?;
                    }
                }
            }
        }
        "array" => {
            let items = payload
                .as_array()
                .ok_or_else(|| payload_invalid(path, "expected an array"))?;
            if let Some(item_schema) = obj.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_node(item_schema, item, &format!("{path}[{i}]"), mode)?;
                }
            }
        }
        "string" => {
            if !payload.is_string() {
                return Err(payload_invalid(path, "expected a string"));
            }
        }
        "number" => {
            if !payload.is_number() {
                return Err(payload_invalid(path, "expected a number"));
            }
        }
        "integer" => {
            if !payload.is_i64() && !payload.is_u64() {
                return Err(payload_invalid(path, "expected an integer"));
            }
        }
        "boolean" => {
            if !payload.is_boolean() {
                return Err(payload_invalid(path, "expected a boolean"));
            }
        }
        other => return Err(schema_invalid(path, &format!("unknown type {other:?}"))),
    }

    Ok(())
}

fn schema_invalid(path: &str, detail: &str) -> Error {
    Error::SchemaInvalid {
        slug: String::new(),
        version: String::new(),
        detail: format!("{path}: {detail}"),
    }
}

fn payload_invalid(path: &str, detail: &str) -> Error {
    Error::SchemaInvalid {
        slug: String::new(),
        version: String::new(),
        detail: format!("{path}: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article_schema() -> Value {
        json!({
            "type": "object",
            "required": ["title", "body"],
            "properties": {
                "title": { "type": "string" },
                "body": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
            },
        })
    }

    #[test]
    fn validate_schema_accepts_well_formed_document() {
        validate_schema(&article_schema()).unwrap();
    }

    #[test]
    fn validate_schema_rejects_unknown_type() {
        let schema = json!({ "type": "object", "properties": { "x": { "type": "blob" } } });
        assert!(validate_schema(&schema).is_err());
    }

    #[test]
    fn strict_mode_rejects_missing_required_field() {
        let payload = json!({ "title": "hello" });
        let err = validate_payload(&article_schema(), &payload).unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid { .. }));
    }

    #[test]
    fn partial_mode_allows_missing_required_field() {
        let payload = json!({ "title": "hello" });
        validate_partial_payload(&article_schema(), &payload).unwrap();
    }

    #[test]
    fn type_mismatch_is_rejected_in_both_modes() {
        let payload = json!({ "title": 5, "body": "ok" });
        assert!(validate_payload(&article_schema(), &payload).is_err());
        assert!(validate_partial_payload(&article_schema(), &payload).is_err());
    }

    #[test]
    fn nested_array_items_are_validated() {
        let payload = json!({ "title": "t", "body": "b", "tags": ["a", 5] });
        assert!(validate_payload(&article_schema(), &payload).is_err());
    }
}
