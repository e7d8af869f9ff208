//! Per-type validation and coercion rules.
//!
//! Every [`FieldType`] exposes [`FieldType::accepts`] and
//! [`FieldType::coerce`]. Null is acceptable for any type unless the
//! field is required, in which case null, the empty string and the
//! empty object are all rejected.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};
use std::net::Ipv4Addr;

use crate::types::FieldType;

const BYTE_MIN: f64 = -128.0;
const BYTE_MAX: f64 = 127.0;
const SHORT_MIN: f64 = -32_768.0;
const SHORT_MAX: f64 = 32_767.0;
const INT_MIN: f64 = -2_147_483_648.0;
const INT_MAX: f64 = 2_147_483_647.0;
const LONG_MIN: f64 = i64::MIN as f64;
const LONG_MAX: f64 = i64::MAX as f64;
const FLOAT_MAX: f64 = 3.402_823_5e38;

const GEO_SHAPE_TYPES: &[&str] = &[
    "point",
    "linestring",
    "polygon",
    "multipoint",
    "multilinestring",
    "multipolygon",
    "geometrycollection",
    "envelope",
    "circle",
];

impl FieldType {
    /// Whether `value` is acceptable for this type.
    ///
    /// `required` additionally rejects null, `""` and `{}`.
    pub fn accepts(&self, value: &Value, required: bool) -> bool {
        if required && missing_when_required(value) {
            return false;
        }
        if value.is_null() {
            return true;
        }

        match self {
            FieldType::Attachment | FieldType::Binary => is_base64(value),
            FieldType::Boolean => is_boolean(value),
            FieldType::Byte => in_range(value, BYTE_MIN, BYTE_MAX),
            FieldType::Short => in_range(value, SHORT_MIN, SHORT_MAX),
            FieldType::Integer => in_range(value, INT_MIN, INT_MAX),
            FieldType::Long => in_range(value, LONG_MIN, LONG_MAX),
            FieldType::Double => in_magnitude(value, f64::MAX),
            FieldType::Float => in_magnitude(value, FLOAT_MAX),
            FieldType::Date => is_date(value),
            FieldType::GeoPoint => is_geo_point(value),
            FieldType::GeoShape => is_geo_shape(value),
            FieldType::Ip => is_ipv4(value),
            FieldType::String | FieldType::Text | FieldType::Keyword => {
                !matches!(value, Value::Array(_) | Value::Object(_))
            }
            FieldType::Object => matches!(value, Value::Object(_) | Value::Array(_)),
        }
    }

    /// Coerce an already-accepted value into its canonical form.
    ///
    /// Null is never coerced. Coercion is idempotent: coercing an
    /// already-canonical value returns it unchanged.
    pub fn coerce(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }

        match self {
            t if t.is_stringlike() => match value {
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => other.clone(),
            },
            FieldType::Boolean => coerce_boolean(value),
            FieldType::Byte | FieldType::Short | FieldType::Integer | FieldType::Long => {
                coerce_integer(value)
            }
            FieldType::Double | FieldType::Float => coerce_float(value),
            FieldType::Date => coerce_date(value),
            // geo_point, geo_shape, object: opaque payloads
            _ => value.clone(),
        }
    }
}

/// Null, empty string or empty object: the forms a required field
/// rejects as missing.
pub fn missing_when_required(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// A number, or a string that parses as one.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn in_range(value: &Value, min: f64, max: f64) -> bool {
    numeric(value).is_some_and(|n| n >= min && n <= max)
}

fn in_magnitude(value: &Value, max: f64) -> bool {
    numeric(value).is_some_and(|n| n.is_finite() && n.abs() <= max)
}

fn is_base64(value: &Value) -> bool {
    match value {
        Value::String(s) => BASE64.decode(s).is_ok(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => matches!(
            s.to_ascii_lowercase().as_str(),
            "true" | "false" | "1" | "0" | "yes" | "no" | "on" | "off"
        ),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => parse_date(s).is_some(),
        _ => false,
    }
}

fn is_geo_point(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.len() == 2 && items.iter().all(|v| numeric(v).is_some()),
        Value::Object(map) => {
            map.get("lat").is_some_and(|v| !v.is_null())
                && map.get("lon").is_some_and(|v| !v.is_null())
        }
        Value::String(s) => {
            let parts: Vec<&str> = s.split(',').collect();
            parts.len() == 2 && parts.iter().all(|p| p.trim().parse::<f64>().is_ok())
        }
        _ => false,
    }
}

fn is_geo_shape(value: &Value) -> bool {
    let Value::Object(map) = value else {
        return false;
    };
    let Some(shape_type) = map.get("type").and_then(Value::as_str) else {
        return false;
    };
    if !GEO_SHAPE_TYPES.contains(&shape_type) {
        return false;
    }

    if shape_type == "geometrycollection" {
        map.get("geometries")
            .and_then(Value::as_array)
            .is_some_and(|members| members.iter().all(is_geo_shape))
    } else {
        map.contains_key("coordinates")
    }
}

fn is_ipv4(value: &Value) -> bool {
    match value {
        Value::String(s) => s.parse::<Ipv4Addr>().is_ok(),
        _ => false,
    }
}

/// Parse a date string: RFC 3339 first, then the common ISO-8601 and
/// date-only shapes chrono can handle.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn coerce_boolean(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(*b),
        Value::Number(n) => Value::Bool(n.as_f64() != Some(0.0)),
        Value::String(s) => Value::Bool(!matches!(
            s.to_ascii_lowercase().as_str(),
            "false" | "no" | "off" | "0"
        )),
        other => other.clone(),
    }
}

fn coerce_integer(value: &Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Value::Number(n.clone())
            } else {
                match n.as_f64() {
                    Some(f) => Value::Number(Number::from(f.trunc() as i64)),
                    None => Value::Number(n.clone()),
                }
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Value::Number(Number::from(i))
            } else if let Ok(f) = trimmed.parse::<f64>() {
                Value::Number(Number::from(f.trunc() as i64))
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

fn coerce_float(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => Value::Number(n),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

fn coerce_date(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_date(s),
        _ => None,
    };

    match parsed {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn byte_range_inclusive() {
        assert!(FieldType::Byte.accepts(&json!(127), false));
        assert!(!FieldType::Byte.accepts(&json!(128), false));
        assert!(FieldType::Byte.accepts(&json!("-128"), false));
        assert!(!FieldType::Byte.accepts(&json!("-129"), false));
    }

    #[test]
    fn short_and_integer_ranges() {
        assert!(FieldType::Short.accepts(&json!(32767), false));
        assert!(!FieldType::Short.accepts(&json!(32768), false));
        assert!(FieldType::Integer.accepts(&json!(-2147483648i64), false));
        assert!(!FieldType::Integer.accepts(&json!(2147483648i64), false));
        assert!(FieldType::Long.accepts(&json!(9007199254740993i64), false));
    }

    #[test]
    fn boolean_tokens_case_insensitive() {
        assert!(FieldType::Boolean.accepts(&json!("off"), false));
        assert!(FieldType::Boolean.accepts(&json!("YES"), false));
        assert!(FieldType::Boolean.accepts(&json!(true), false));
        assert!(FieldType::Boolean.accepts(&json!(0), false));
        assert!(!FieldType::Boolean.accepts(&json!("nope"), false));
        assert!(!FieldType::Boolean.accepts(&json!([]), false));
    }

    #[test]
    fn null_needs_required_to_reject() {
        assert!(FieldType::String.accepts(&Value::Null, false));
        assert!(!FieldType::String.accepts(&Value::Null, true));
        assert!(!FieldType::String.accepts(&json!(""), true));
        assert!(FieldType::String.accepts(&json!(""), false));
        assert!(!FieldType::Object.accepts(&json!({}), true));
    }

    #[test]
    fn float_magnitude_bounds() {
        assert!(FieldType::Float.accepts(&json!(0), false));
        assert!(FieldType::Float.accepts(&json!(-12.5), false));
        assert!(!FieldType::Float.accepts(&json!(3.5e38), false));
        assert!(FieldType::Double.accepts(&json!("1.25e100"), false));
        assert!(!FieldType::Double.accepts(&json!("not a number"), false));
    }

    #[test]
    fn base64_padding_enforced() {
        assert!(FieldType::Binary.accepts(&json!("dGVzdA=="), false));
        assert!(!FieldType::Binary.accepts(&json!("dGVzdA="), false));
        assert!(!FieldType::Attachment.accepts(&json!("not base64!"), false));
        assert!(!FieldType::Binary.accepts(&json!(42), false));
        // the empty string decodes to zero bytes, so it only fails
        // when the field is required
        assert!(FieldType::Binary.accepts(&json!(""), false));
        assert!(!FieldType::Binary.accepts(&json!(""), true));
    }

    #[test]
    fn date_forms() {
        assert!(FieldType::Date.accepts(&json!("2023-04-01T10:30:00Z"), false));
        assert!(FieldType::Date.accepts(&json!("2023-04-01"), false));
        assert!(FieldType::Date.accepts(&json!(1680345000000i64), false));
        assert!(!FieldType::Date.accepts(&json!("yesterday"), false));
    }

    #[test]
    fn geo_point_forms() {
        assert!(FieldType::GeoPoint.accepts(&json!([40.12, -71.34]), false));
        assert!(FieldType::GeoPoint.accepts(&json!(["40.12", "-71.34"]), false));
        assert!(!FieldType::GeoPoint.accepts(&json!([40.12]), false));
        assert!(FieldType::GeoPoint.accepts(&json!({"lat": 40.12, "lon": -71.34}), false));
        assert!(!FieldType::GeoPoint.accepts(&json!({"lat": 40.12}), false));
        assert!(FieldType::GeoPoint.accepts(&json!("40.12,-71.34"), false));
        assert!(!FieldType::GeoPoint.accepts(&json!("40.12,-71.34,5"), false));
        assert!(!FieldType::GeoPoint.accepts(&json!("somewhere"), false));
    }

    #[test]
    fn geo_shape_forms() {
        assert!(FieldType::GeoShape.accepts(
            &json!({"type": "point", "coordinates": [-77.03653, 38.897676]}),
            false
        ));
        assert!(!FieldType::GeoShape.accepts(&json!({"type": "point"}), false));
        assert!(!FieldType::GeoShape.accepts(
            &json!({"type": "blob", "coordinates": []}),
            false
        ));
        assert!(FieldType::GeoShape.accepts(
            &json!({
                "type": "geometrycollection",
                "geometries": [
                    {"type": "point", "coordinates": [0.0, 0.0]},
                    {"type": "linestring", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
                ]
            }),
            false
        ));
        assert!(!FieldType::GeoShape.accepts(
            &json!({
                "type": "geometrycollection",
                "geometries": [{"type": "point"}]
            }),
            false
        ));
    }

    #[test]
    fn ipv4_dotted_quad() {
        assert!(FieldType::Ip.accepts(&json!("10.0.0.1"), false));
        assert!(!FieldType::Ip.accepts(&json!("256.0.0.1"), false));
        assert!(!FieldType::Ip.accepts(&json!("10.0.0"), false));
        assert!(!FieldType::Ip.accepts(&json!(167772161), false));
    }

    #[test]
    fn string_rejects_structured() {
        assert!(FieldType::String.accepts(&json!("name"), false));
        assert!(FieldType::Text.accepts(&json!(42), false));
        assert!(FieldType::Keyword.accepts(&json!(true), false));
        assert!(!FieldType::String.accepts(&json!({"a": 1}), false));
        assert!(!FieldType::Text.accepts(&json!([1, 2]), false));
    }

    #[test]
    fn coerce_numeric_strings() {
        assert_eq!(FieldType::Integer.coerce(&json!("42")), json!(42));
        assert_eq!(FieldType::Long.coerce(&json!("12.9")), json!(12));
        assert_eq!(FieldType::Double.coerce(&json!("12.5")), json!(12.5));
        assert_eq!(FieldType::Byte.coerce(&json!(7)), json!(7));
    }

    #[test]
    fn coerce_boolean_tokens() {
        assert_eq!(FieldType::Boolean.coerce(&json!("off")), json!(false));
        assert_eq!(FieldType::Boolean.coerce(&json!("yes")), json!(true));
        assert_eq!(FieldType::Boolean.coerce(&json!(0)), json!(false));
        assert_eq!(FieldType::Boolean.coerce(&json!(1)), json!(true));
        assert_eq!(FieldType::Boolean.coerce(&json!(false)), json!(false));
    }

    #[test]
    fn coerce_stringifies_scalars() {
        assert_eq!(FieldType::String.coerce(&json!(42)), json!("42"));
        assert_eq!(FieldType::Keyword.coerce(&json!(true)), json!("true"));
        assert_eq!(FieldType::Ip.coerce(&json!("10.0.0.1")), json!("10.0.0.1"));
        // structured payloads pass through untouched
        assert_eq!(FieldType::String.coerce(&json!([1])), json!([1]));
    }

    #[test]
    fn coerce_date_canonical_and_idempotent() {
        let coerced = FieldType::Date.coerce(&json!("2023-04-01"));
        assert_eq!(coerced, json!("2023-04-01T00:00:00.000Z"));
        assert_eq!(FieldType::Date.coerce(&coerced), coerced);

        let epoch = FieldType::Date.coerce(&json!(0));
        assert_eq!(epoch, json!("1970-01-01T00:00:00.000Z"));
    }

    #[test]
    fn coerce_leaves_null_alone() {
        assert_eq!(FieldType::Boolean.coerce(&Value::Null), Value::Null);
        assert_eq!(FieldType::Integer.coerce(&Value::Null), Value::Null);
        assert_eq!(FieldType::Date.coerce(&Value::Null), Value::Null);
    }
}
