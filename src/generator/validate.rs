// src/generator/validate.rs
//
// Structural checks used to vet values proposed by a completion provider.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

use crate::parser::schema::{ArraySchema, NumberSchema, ObjectSchema, MAX_REF_HOPS};
use crate::parser::{Definitions, SchemaKind, SchemaNode, StringSchema};

/// Check that `value` satisfies `node`'s kind, format, enum, bounds and required keys.
///
/// Unsupported kinds accept anything, mirroring how the generator degrades on them.
pub fn validate(node: &SchemaNode, value: &Value, definitions: &Definitions) -> bool {
    check(node, value, definitions, 0)
}

fn check(node: &SchemaNode, value: &Value, definitions: &Definitions, ref_hops: usize) -> bool {
    if !node.enum_values.is_empty() && !node.enum_values.contains(value) {
        return false;
    }

    match &node.kind {
        SchemaKind::String(s) => value.as_str().map_or(false, |text| string_ok(s, text)),
        SchemaKind::Integer(bounds) => is_integer(value) && value.as_f64().map_or(false, |n| within(bounds, n)),
        SchemaKind::Number(bounds) => value.as_f64().map_or(false, |n| within(bounds, n)),
        SchemaKind::Boolean => value.is_boolean(),
        SchemaKind::Object(o) => object_ok(o, value, definitions),
        SchemaKind::Array(a) => array_ok(a, value, definitions),
        SchemaKind::Ref(name) => {
            if ref_hops >= MAX_REF_HOPS {
                return false;
            }
            definitions
                .get(name)
                .map_or(true, |target| check(target, value, definitions, ref_hops + 1))
        }
        SchemaKind::Unsupported(_) => true,
    }
}

fn object_ok(object: &ObjectSchema, value: &Value, definitions: &Definitions) -> bool {
    let map = match value.as_object() {
        Some(map) => map,
        None => return false,
    };

    object.required.iter().all(|name| map.contains_key(name))
        && object.properties.iter().all(|(name, child)| {
            map.get(name)
                .map_or(true, |v| check(child, v, definitions, 0))
        })
}

fn array_ok(array: &ArraySchema, value: &Value, definitions: &Definitions) -> bool {
    let items = match value.as_array() {
        Some(items) => items,
        None => return false,
    };

    items.len() >= array.min_items.unwrap_or(0)
        && array.max_items.map_or(true, |max| items.len() <= max)
        && items.iter().all(|item| check(&array.items, item, definitions, 0))
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64() || value.as_f64().map_or(false, |n| n.fract() == 0.0)
}

fn within(bounds: &NumberSchema, n: f64) -> bool {
    let above_min = match bounds.minimum {
        Some(min) if bounds.exclusive_minimum => n > min,
        Some(min) => n >= min,
        None => true,
    };
    let below_max = match bounds.maximum {
        Some(max) if bounds.exclusive_maximum => n < max,
        Some(max) => n <= max,
        None => true,
    };
    above_min && below_max
}

fn string_ok(schema: &StringSchema, text: &str) -> bool {
    let len = text.chars().count();
    if schema.min_length.map_or(false, |min| len < min) || schema.max_length.map_or(false, |max| len > max) {
        return false;
    }

    match schema.format.as_deref() {
        Some("email") => is_email(text),
        Some("date-time") => DateTime::parse_from_rfc3339(text).is_ok(),
        Some("date") => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
        Some("uuid") => Uuid::parse_str(text).is_ok(),
        Some("ipv4") => text.parse::<Ipv4Addr>().is_ok(),
        Some("ipv6") => text.parse::<Ipv6Addr>().is_ok(),
        Some("uri") | Some("url") => text.contains("://") && !text.contains(char::is_whitespace),
        _ => true,
    }
}

/// Loose syntactic check: one `@`, a non-empty local part and a dotted domain
pub fn is_email(text: &str) -> bool {
    if text.contains(char::is_whitespace) {
        return false;
    }
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid(schema: Value, value: Value) -> bool {
        validate(&SchemaNode::from_value(&schema), &value, &Definitions::new())
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_email("jane.doe@example.org"));
        assert!(!is_email("jane.doe"));
        assert!(!is_email("@example.org"));
        assert!(!is_email("a@b@example.org"));
        assert!(!is_email("jane doe@example.org"));
        assert!(!is_email("jane@localhost"));
    }

    #[test]
    fn test_kinds_and_formats() {
        assert!(valid(json!({ "type": "string", "format": "date-time" }), json!("2023-05-01T08:30:00+02:00")));
        assert!(!valid(json!({ "type": "string", "format": "date-time" }), json!("yesterday")));
        assert!(!valid(json!({ "type": "string", "format": "uuid" }), json!("not-a-uuid")));
        assert!(!valid(json!({ "type": "integer" }), json!(1.5)));
        assert!(valid(json!({ "type": "integer" }), json!(3)));
        assert!(!valid(json!({ "type": "boolean" }), json!("true")));
        assert!(valid(json!({ "oneOf": [] }), json!({ "anything": 1 })));
    }

    #[test]
    fn test_enum_and_bounds() {
        assert!(!valid(json!({ "type": "string", "enum": ["a", "b"] }), json!("c")));
        assert!(!valid(json!({ "type": "integer", "minimum": 0 }), json!(-1)));
        assert!(!valid(json!({ "type": "number", "maximum": 1, "exclusiveMaximum": true }), json!(1.0)));
        assert!(!valid(json!({ "type": "string", "maxLength": 2 }), json!("abc")));
    }

    #[test]
    fn test_objects_and_arrays() {
        let user = json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "tags": { "type": "array", "minItems": 1, "items": { "type": "string" } }
            }
        });
        assert!(valid(user.clone(), json!({ "name": "Ada", "tags": ["admin"] })));
        assert!(!valid(user.clone(), json!({ "tags": ["admin"] })));
        assert!(!valid(user.clone(), json!({ "name": "Ada", "tags": [] })));
        assert!(!valid(user, json!({ "name": "Ada", "tags": [1] })));
    }
}
