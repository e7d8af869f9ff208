//! Core types for document mappings.

use serde_json::Value;

/// Container path of the mapping root in the dynamic-policy and
/// required-field registries.
pub const ROOT_PATH: &str = ".";

/// Renders a value for inclusion in a validation message.
///
/// Strings render bare (no quotes), everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Joins a parent container path and a field name into a dotted path.
pub fn join_path(parent: Option<&str>, field: &str) -> String {
    match parent {
        Some(p) => format!("{p}.{field}"),
        None => field.to_string(),
    }
}

/// The closed set of declarable field types.
///
/// Each variant carries its validation and coercion rules (see the
/// `matrix` module); dispatch is by match, not by a string-keyed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Attachment,
    Binary,
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Double,
    Float,
    Date,
    GeoPoint,
    GeoShape,
    Ip,
    String,
    Text,
    Keyword,
    Object,
}

impl FieldType {
    /// Parse a declared type name.
    ///
    /// Returns `None` for unknown names (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attachment" => Some(FieldType::Attachment),
            "binary" => Some(FieldType::Binary),
            "boolean" => Some(FieldType::Boolean),
            "byte" => Some(FieldType::Byte),
            "short" => Some(FieldType::Short),
            "integer" => Some(FieldType::Integer),
            "long" => Some(FieldType::Long),
            "double" => Some(FieldType::Double),
            "float" => Some(FieldType::Float),
            "date" => Some(FieldType::Date),
            "geo_point" => Some(FieldType::GeoPoint),
            "geo_shape" => Some(FieldType::GeoShape),
            "ip" => Some(FieldType::Ip),
            "string" => Some(FieldType::String),
            "text" => Some(FieldType::Text),
            "keyword" => Some(FieldType::Keyword),
            "object" => Some(FieldType::Object),
            _ => None,
        }
    }

    /// Returns the declared type name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Attachment => "attachment",
            FieldType::Binary => "binary",
            FieldType::Boolean => "boolean",
            FieldType::Byte => "byte",
            FieldType::Short => "short",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Date => "date",
            FieldType::GeoPoint => "geo_point",
            FieldType::GeoShape => "geo_shape",
            FieldType::Ip => "ip",
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Object => "object",
        }
    }

    /// True for the types whose canonical form is a string.
    pub fn is_stringlike(&self) -> bool {
        matches!(
            self,
            FieldType::Attachment
                | FieldType::Binary
                | FieldType::Ip
                | FieldType::String
                | FieldType::Text
                | FieldType::Keyword
        )
    }

    /// True for types whose values are opaque structured payloads that
    /// the coercion walk must not descend into.
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            FieldType::Object | FieldType::GeoPoint | FieldType::GeoShape
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Policy for document fields absent from the field registry at a
/// given container path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynamicPolicy {
    /// Keep unregistered fields verbatim (the default for
    /// `properties` sub-documents).
    #[default]
    True,
    /// Silently drop unregistered fields from the sanitized clone
    /// (the default for object-typed leaves).
    False,
    /// Every unregistered field is a validation error.
    Strict,
}

impl DynamicPolicy {
    /// Parse a `dynamic` mapping attribute.
    ///
    /// Accepts JSON booleans and the string forms `"true"`, `"false"`
    /// and `"strict"`. Returns `None` for anything else.
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(DynamicPolicy::True),
            Value::Bool(false) => Some(DynamicPolicy::False),
            Value::String(s) => match s.as_str() {
                "true" => Some(DynamicPolicy::True),
                "false" => Some(DynamicPolicy::False),
                "strict" => Some(DynamicPolicy::Strict),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the mapping-attribute spelling of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            DynamicPolicy::True => "true",
            DynamicPolicy::False => "false",
            DynamicPolicy::Strict => "strict",
        }
    }
}

impl std::fmt::Display for DynamicPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled definition of a single leaf field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Declared type; doubles as the compiled validator/coercer.
    pub field_type: FieldType,
    /// Whether a non-empty value must be present.
    pub required: bool,
    /// Dynamic policy, only meaningful when `field_type` is `object`.
    pub dynamic: Option<DynamicPolicy>,
    /// Analyzer hint (`analyzed`, `not_analyzed`, `no`).
    pub index: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_type_parse_round_trips() {
        for name in [
            "attachment",
            "binary",
            "boolean",
            "byte",
            "short",
            "integer",
            "long",
            "double",
            "float",
            "date",
            "geo_point",
            "geo_shape",
            "ip",
            "string",
            "text",
            "keyword",
            "object",
        ] {
            let parsed = FieldType::parse(name).expect(name);
            assert_eq!(parsed.name(), name);
        }
    }

    #[test]
    fn field_type_parse_unknown() {
        assert_eq!(FieldType::parse("uuid"), None);
        assert_eq!(FieldType::parse("STRING"), None);
        assert_eq!(FieldType::parse(""), None);
    }

    #[test]
    fn dynamic_policy_parse_forms() {
        assert_eq!(DynamicPolicy::parse(&json!(true)), Some(DynamicPolicy::True));
        assert_eq!(
            DynamicPolicy::parse(&json!(false)),
            Some(DynamicPolicy::False)
        );
        assert_eq!(
            DynamicPolicy::parse(&json!("strict")),
            Some(DynamicPolicy::Strict)
        );
        assert_eq!(DynamicPolicy::parse(&json!("true")), Some(DynamicPolicy::True));
        assert_eq!(DynamicPolicy::parse(&json!("loose")), None);
        assert_eq!(DynamicPolicy::parse(&json!(1)), None);
    }

    #[test]
    fn join_path_with_and_without_parent() {
        assert_eq!(join_path(None, "name"), "name");
        assert_eq!(join_path(Some("identity"), "docId"), "identity.docId");
    }

    #[test]
    fn display_value_string_is_bare() {
        assert_eq!(display_value(&json!("abc")), "abc");
        assert_eq!(display_value(&json!(128)), "128");
        assert_eq!(display_value(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
