//! Document-tree coercion.
//!
//! Applied to documents the store has already accepted (on read or
//! after a write): walks the tree, resolves each leaf's declared type
//! through the field registry and rewrites the value into canonical
//! form. Idempotent; unregistered fields pass through untouched.

use serde_json::{Map, Value};

use crate::analyzer::Mapping;
use crate::types::{join_path, FieldType};

/// Coerce a document (or an array of documents) in place.
pub fn coerce_model(mapping: &Mapping, model: &mut Value) {
    match model {
        Value::Object(map) => coerce_container(mapping, map, None),
        Value::Array(items) => {
            for item in items {
                coerce_model(mapping, item);
            }
        }
        _ => {}
    }
}

fn coerce_container(mapping: &Mapping, map: &mut Map<String, Value>, parent: Option<&str>) {
    for (field, value) in map.iter_mut() {
        let path = join_path(parent, field);
        let leaf = mapping.field(&path).map(|spec| spec.field_type);
        coerce_at(mapping, value, &path, leaf);
    }
}

fn coerce_at(mapping: &Mapping, value: &mut Value, path: &str, leaf: Option<FieldType>) {
    match value {
        Value::Object(map) => {
            // object/geo-typed payloads are opaque, not sub-documents
            if !leaf.is_some_and(|t| t.is_opaque()) {
                coerce_container(mapping, map, Some(path));
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                coerce_at(mapping, item, path, leaf);
            }
        }
        _ => {
            if let Some(field_type) = leaf {
                *value = field_type.coerce(value);
            }
        }
    }
}
