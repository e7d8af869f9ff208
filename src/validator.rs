//! Recursive document validation against a compiled mapping.
//!
//! Validation never mutates the caller's document: all sanitization
//! happens on a deep clone carried in the returned [`Validation`].

use serde_json::Value;

use crate::analyzer::Mapping;
use crate::matrix::missing_when_required;
use crate::types::{display_value, join_path, DynamicPolicy};

/// Outcome of validating one document.
#[derive(Debug, Clone)]
pub struct Validation {
    /// Value found at the mapping's identity path, first match wins.
    pub identity: Option<Value>,
    /// Deep clone of the input with dynamic-drop effects applied.
    ///
    /// Present even when validation failed, which makes the clone
    /// useful for diagnostics; absent only when the input was not a
    /// non-empty object.
    pub sanitized: Option<Value>,
    /// Validation errors in discovery order; empty iff the document
    /// is schema-acceptable.
    pub errors: Vec<String>,
}

impl Validation {
    fn empty() -> Self {
        Self {
            identity: None,
            sanitized: None,
            errors: Vec::new(),
        }
    }

    /// Whether the document passed validation.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a document against the mapping.
///
/// `suppress_required` skips both the required-field bookkeeping and
/// null leaf values, which is what partial-update payloads need.
pub fn validate_model(mapping: &Mapping, model: &Value, suppress_required: bool) -> Validation {
    validate_container(mapping, model, None, suppress_required)
}

fn validate_container(
    mapping: &Mapping,
    model: &Value,
    parent: Option<&str>,
    suppress_required: bool,
) -> Validation {
    let mut result = Validation::empty();

    let object = match model.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => {
            if parent.is_none() {
                result
                    .errors
                    .push("model is not an object or is empty".to_string());
            }
            return result;
        }
    };

    let mut pending_required: Vec<&String> = mapping.required_fields(parent).iter().collect();
    let mut clone = object.clone();

    for (field, value) in object {
        let path = join_path(parent, field);

        // identity capture, first match wins
        if result.identity.is_none() && mapping.id_path() == Some(path.as_str()) {
            result.identity = Some(value.clone());
        }

        pending_required.retain(|name| *name != field);

        // an array whose path carries a dynamic policy is an array of
        // sub-documents: validate each element independently, stopping
        // at the first failing element
        if let (Some(elements), true) = (value.as_array(), mapping.is_container(&path)) {
            for (index, element) in elements.iter().enumerate() {
                let nested = validate_container(mapping, element, Some(&path), suppress_required);
                let failed = !nested.errors.is_empty();

                if let Some(slot) = clone
                    .get_mut(field)
                    .and_then(Value::as_array_mut)
                    .and_then(|arr| arr.get_mut(index))
                {
                    *slot = nested.sanitized.unwrap_or(Value::Null);
                }
                for error in nested.errors {
                    result
                        .errors
                        .push(error.replacen(path.as_str(), &format!("{path}[{index}]"), 1));
                }
                if failed {
                    break;
                }
            }
            continue;
        }

        // plain sub-document
        if value.is_object() {
            let nested = validate_container(mapping, value, Some(&path), suppress_required);
            if result.identity.is_none() {
                result.identity = nested.identity;
            }
            clone.insert(field.clone(), nested.sanitized.unwrap_or(Value::Null));
            result.errors.extend(nested.errors);
            continue;
        }

        // unregistered field: the parent's dynamic policy decides
        let Some(spec) = mapping.field(&path) else {
            match mapping.dynamic_policy(parent) {
                DynamicPolicy::True => {}
                DynamicPolicy::Strict => result
                    .errors
                    .push(format!("{path} is not a valid field in the strict type mapping")),
                DynamicPolicy::False => {
                    clone.shift_remove(field);
                }
            }
            continue;
        };

        // partial-update payloads skip empty registered values
        if suppress_required && value.is_null() {
            continue;
        }

        // array of leaf values: each element validated individually
        if let Some(elements) = value.as_array() {
            for (index, element) in elements.iter().enumerate() {
                if !spec.field_type.accepts(element, spec.required) {
                    result.errors.push(format!(
                        "{path} contains an invalid value ({}) at index {index} for type {}",
                        display_value(element),
                        spec.field_type
                    ));
                    break;
                }
            }
            continue;
        }

        // a required leaf supplied empty reads as missing, not mistyped
        if spec.required && missing_when_required(value) {
            result.errors.push(format!("field {path} is required"));
        } else if !spec.field_type.accepts(value, spec.required) {
            result.errors.push(format!(
                "{path} contains an invalid value ({}) for type {}",
                display_value(value),
                spec.field_type
            ));
        }
    }

    if !suppress_required {
        for name in pending_required {
            result
                .errors
                .push(format!("field {} is required", join_path(parent, name)));
        }
    }

    result.sanitized = Some(Value::Object(clone));
    result
}
