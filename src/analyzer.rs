//! Mapping analysis.
//!
//! Walks a raw mapping tree once and compiles it into the read-only
//! registries every validation reads: the flat field registry, the
//! dynamic-policy registry, the required-field index and the optional
//! identity path. A [`Mapping`] is never mutated after construction
//! and can be shared by reference across concurrent validations.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::MappingError;
use crate::types::{join_path, DynamicPolicy, FieldSpec, FieldType, ROOT_PATH};

/// Compiled, immutable form of a mapping definition.
#[derive(Debug, Clone)]
pub struct Mapping {
    fields: BTreeMap<String, FieldSpec>,
    dynamic: BTreeMap<String, DynamicPolicy>,
    required: BTreeMap<String, Vec<String>>,
    id_path: Option<String>,
}

impl Mapping {
    /// Analyze a raw mapping tree.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] if the root is not an object with an
    /// object-typed `properties`, a leaf lacks a `type`, a type name
    /// is unknown, or a `dynamic` attribute is not `true`, `false` or
    /// `"strict"`.
    pub fn analyze(mapping: &Value) -> Result<Self, MappingError> {
        let Some(root) = mapping.as_object() else {
            return Err(MappingError::NotAnObject);
        };
        let Some(properties) = root.get("properties").and_then(Value::as_object) else {
            return Err(MappingError::NotAnObject);
        };

        let mut compiled = Mapping {
            fields: BTreeMap::new(),
            dynamic: BTreeMap::new(),
            required: BTreeMap::new(),
            id_path: None,
        };

        compiled.record_dynamic(ROOT_PATH, root.get("dynamic"), DynamicPolicy::True)?;
        compiled.walk_properties(properties, None)?;

        if let Some(path) = root
            .get("_id")
            .and_then(|id| id.get("path"))
            .and_then(Value::as_str)
        {
            compiled.id_path = Some(path.to_string());
        }

        Ok(compiled)
    }

    /// Looks up a registered leaf field by dotted path.
    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.get(path)
    }

    /// Whether a leaf field is registered at the dotted path.
    pub fn field_exists(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    /// Iterates all registered fields in path order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(path, spec)| (path.as_str(), spec))
    }

    /// Whether a dynamic policy is registered at the path, which marks
    /// the path as a sub-document (or object-typed) container.
    pub fn is_container(&self, path: &str) -> bool {
        self.dynamic.contains_key(path)
    }

    /// Dynamic policy governing unregistered fields in the container;
    /// unregistered containers default to `true`.
    pub fn dynamic_policy(&self, container: Option<&str>) -> DynamicPolicy {
        self.dynamic
            .get(container.unwrap_or(ROOT_PATH))
            .copied()
            .unwrap_or_default()
    }

    /// Names of the required direct children of a container.
    pub fn required_fields(&self, container: Option<&str>) -> &[String] {
        self.required
            .get(container.unwrap_or(ROOT_PATH))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The schema-declared identity path, if any.
    pub fn id_path(&self) -> Option<&str> {
        self.id_path.as_deref()
    }

    /// Dotted paths of string fields that the backend analyzes, i.e.
    /// those not opting out via an `index` attribute.
    pub fn analyzed_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, spec)| {
                spec.field_type == FieldType::String
                    && spec.index.as_deref().unwrap_or("analyzed") == "analyzed"
            })
            .map(|(path, _)| path.as_str())
            .collect()
    }

    fn record_dynamic(
        &mut self,
        path: &str,
        attribute: Option<&Value>,
        default: DynamicPolicy,
    ) -> Result<(), MappingError> {
        let policy = match attribute {
            Some(value) => {
                DynamicPolicy::parse(value).ok_or_else(|| MappingError::UnknownDynamicPolicy {
                    path: path.to_string(),
                    value: value.to_string(),
                })?
            }
            None => default,
        };
        self.dynamic.entry(path.to_string()).or_insert(policy);
        Ok(())
    }

    fn walk_properties(
        &mut self,
        properties: &Map<String, Value>,
        parent: Option<&str>,
    ) -> Result<(), MappingError> {
        for (name, field) in properties {
            let path = join_path(parent, name);

            // a field with its own `properties` is a sub-document
            if let Some(nested) = field.get("properties").and_then(Value::as_object) {
                self.record_dynamic(&path, field.get("dynamic"), DynamicPolicy::True)?;
                self.walk_properties(nested, Some(&path))?;
                continue;
            }

            let Some(type_name) = field.get("type").and_then(Value::as_str) else {
                return Err(MappingError::MissingType { path });
            };
            let Some(field_type) = FieldType::parse(type_name) else {
                return Err(MappingError::UnknownType {
                    path,
                    type_name: type_name.to_string(),
                });
            };

            // object-typed leaves are free-form payload containers,
            // default-closed unlike `properties` sub-documents
            let mut dynamic = None;
            if field_type == FieldType::Object {
                self.record_dynamic(&path, field.get("dynamic"), DynamicPolicy::False)?;
                dynamic = Some(self.dynamic_policy(Some(&path)));
            }

            let required = field.get("required").and_then(Value::as_bool).unwrap_or(false);
            if required {
                self.required
                    .entry(parent.unwrap_or(ROOT_PATH).to_string())
                    .or_default()
                    .push(name.clone());
            }

            let index = field
                .get("index")
                .and_then(Value::as_str)
                .map(str::to_string);

            self.fields.insert(
                path,
                FieldSpec {
                    field_type,
                    required,
                    dynamic,
                    index,
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cat_mapping() -> Value {
        json!({
            "_id": { "path": "identity.docId" },
            "dynamic": "strict",
            "properties": {
                "identity": {
                    "properties": {
                        "docId": { "type": "string", "required": true }
                    }
                },
                "name": { "type": "string", "required": true, "index": "not_analyzed" },
                "breed": { "type": "string" },
                "age": { "type": "byte" },
                "attributes": { "type": "object", "dynamic": true },
                "adoptedAt": { "type": "date" }
            }
        })
    }

    #[test]
    fn analyze_registers_leaf_paths() {
        let mapping = Mapping::analyze(&cat_mapping()).unwrap();

        assert!(mapping.field_exists("name"));
        assert!(mapping.field_exists("identity.docId"));
        assert!(!mapping.field_exists("identity"));
        assert_eq!(
            mapping.field("age").unwrap().field_type,
            FieldType::Byte
        );
    }

    #[test]
    fn analyze_id_path() {
        let mapping = Mapping::analyze(&cat_mapping()).unwrap();
        assert_eq!(mapping.id_path(), Some("identity.docId"));
    }

    #[test]
    fn analyze_dynamic_policies() {
        let mapping = Mapping::analyze(&cat_mapping()).unwrap();

        assert_eq!(mapping.dynamic_policy(None), DynamicPolicy::Strict);
        // sub-documents default open
        assert_eq!(
            mapping.dynamic_policy(Some("identity")),
            DynamicPolicy::True
        );
        // object-typed leaf carries its own attribute
        assert_eq!(
            mapping.dynamic_policy(Some("attributes")),
            DynamicPolicy::True
        );
        assert!(mapping.is_container("attributes"));
        assert!(!mapping.is_container("name"));
    }

    #[test]
    fn object_leaf_defaults_closed() {
        let mapping = Mapping::analyze(&json!({
            "properties": { "payload": { "type": "object" } }
        }))
        .unwrap();
        assert_eq!(
            mapping.dynamic_policy(Some("payload")),
            DynamicPolicy::False
        );
    }

    #[test]
    fn analyze_required_index_per_container() {
        let mapping = Mapping::analyze(&cat_mapping()).unwrap();

        assert_eq!(mapping.required_fields(None), ["name"]);
        assert_eq!(mapping.required_fields(Some("identity")), ["docId"]);
        assert!(mapping.required_fields(Some("attributes")).is_empty());
    }

    #[test]
    fn analyze_rejects_non_object_root() {
        assert!(matches!(
            Mapping::analyze(&json!("nope")),
            Err(MappingError::NotAnObject)
        ));
        assert!(matches!(
            Mapping::analyze(&json!({ "properties": 42 })),
            Err(MappingError::NotAnObject)
        ));
    }

    #[test]
    fn analyze_rejects_missing_type() {
        let result = Mapping::analyze(&json!({
            "properties": { "pet": { "name": {} } }
        }));
        assert!(matches!(
            result,
            Err(MappingError::MissingType { path }) if path == "pet"
        ));
    }

    #[test]
    fn analyze_rejects_unknown_type() {
        let result = Mapping::analyze(&json!({
            "properties": {
                "pet": { "properties": { "tag": { "type": "uuid" } } }
            }
        }));
        match result {
            Err(MappingError::UnknownType { path, type_name }) => {
                assert_eq!(path, "pet.tag");
                assert_eq!(type_name, "uuid");
            }
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn analyze_rejects_unknown_dynamic_token() {
        let result = Mapping::analyze(&json!({
            "dynamic": "loose",
            "properties": { "name": { "type": "string" } }
        }));
        assert!(matches!(
            result,
            Err(MappingError::UnknownDynamicPolicy { .. })
        ));
    }

    #[test]
    fn analyzed_fields_skips_typed_and_opted_out() {
        let mapping = Mapping::analyze(&cat_mapping()).unwrap();
        let analyzed = mapping.analyzed_fields();
        assert!(analyzed.contains(&"breed"));
        assert!(analyzed.contains(&"identity.docId"));
        // not_analyzed opt-out and non-string types are excluded
        assert!(!analyzed.contains(&"name"));
        assert!(!analyzed.contains(&"age"));
    }
}
