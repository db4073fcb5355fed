// src/generator/data.rs

use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::assisted::{AssistSettings, Assistant, CompletionProvider};
use super::context::{GenerationContext, GenerationMode};
use crate::parser::schema::{ArraySchema, NumberSchema, ObjectSchema, MAX_REF_HOPS};
use crate::parser::{SchemaKind, SchemaNode, SpecError, StringSchema};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Unsupported schema kind: {0}")]
    UnsupportedSchemaKind(String),

    #[error("Maximum nesting depth {max_depth} exceeded (reached {depth})")]
    DepthExceeded { depth: usize, max_depth: usize },

    #[error(transparent)]
    Spec(#[from] SpecError),
}

pub type Result<T> = std::result::Result<T, GenerationError>;

pub const PLACEHOLDER_EMAIL: &str = "user@example.com";
pub const PLACEHOLDER_DATE_TIME: &str = "2024-01-01T12:00:00Z";
pub const PLACEHOLDER_DATE: &str = "2024-01-01";
pub const PLACEHOLDER_UUID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Position of a node in the tree being generated
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    /// Number of enclosing containers, this one included once entered
    depth: usize,
    /// `$ref` hops since the last container
    ref_hops: usize,
}

impl Cursor {
    fn enter_container(self, max_depth: usize) -> Result<Cursor> {
        let depth = self.depth + 1;
        if depth > max_depth {
            return Err(GenerationError::DepthExceeded { depth, max_depth });
        }
        Ok(Cursor { depth, ref_hops: 0 })
    }
}

/// Synthesizes example values from schema nodes.
///
/// A deterministic generator is a pure function of its inputs. An assisted one
/// first asks its [`CompletionProvider`] and keeps the answer only when it
/// satisfies the schema; every failure on that path falls back to the
/// deterministic rules.
pub struct Generator {
    assistant: Option<Assistant>,
}

impl Generator {
    pub fn deterministic() -> Self {
        Generator { assistant: None }
    }

    pub fn assisted(provider: Arc<dyn CompletionProvider>, settings: &AssistSettings) -> Self {
        Generator {
            assistant: Some(Assistant::new(provider, settings)),
        }
    }

    /// Name of the completion provider, if this generator has one
    pub fn provider_name(&self) -> Option<&str> {
        self.assistant.as_ref().map(Assistant::provider_name)
    }

    pub fn generate(&self, node: &SchemaNode, ctx: &GenerationContext) -> Result<Value> {
        self.generate_named(node, ctx, None)
    }

    /// Generate a value for `node`; `name` is the property or parameter the value is for
    pub fn generate_named(&self, node: &SchemaNode, ctx: &GenerationContext, name: Option<&str>) -> Result<Value> {
        // Structural errors (depth, strict unsupported kinds) do not depend on the mode
        let fallback = build(node, ctx, name, Cursor::default())?;

        if let (GenerationMode::Assisted(kind), Some(assistant)) = (ctx.mode, &self.assistant) {
            match assistant.suggest(node, ctx, name) {
                Ok(value) => return Ok(value),
                Err(e) => warn!(
                    "Assisted generation via {} unavailable ({}), using deterministic rules",
                    kind, e
                ),
            }
        } else if let GenerationMode::Assisted(kind) = ctx.mode {
            debug!("No {} provider configured, using deterministic rules", kind);
        }

        Ok(fallback)
    }
}

fn build(node: &SchemaNode, ctx: &GenerationContext, name: Option<&str>, cursor: Cursor) -> Result<Value> {
    if let Some(first) = node.enum_values.first() {
        return Ok(first.clone());
    }

    match &node.kind {
        SchemaKind::String(s) => Ok(Value::String(placeholder_string(s, name))),
        SchemaKind::Integer(bounds) => Ok(json!(integer_value(bounds))),
        SchemaKind::Number(bounds) => Ok(json!(number_value(bounds))),
        SchemaKind::Boolean => Ok(Value::Bool(true)),
        SchemaKind::Object(o) => build_object(o, ctx, cursor.enter_container(ctx.max_depth)?),
        SchemaKind::Array(a) => build_array(a, ctx, name, cursor.enter_container(ctx.max_depth)?),
        SchemaKind::Ref(target) => {
            if cursor.ref_hops >= MAX_REF_HOPS {
                return unsupported(ctx, &format!("circular $ref {}", target));
            }
            match ctx.definitions.get(target) {
                Some(resolved) => build(
                    resolved,
                    ctx,
                    name,
                    Cursor {
                        ref_hops: cursor.ref_hops + 1,
                        ..cursor
                    },
                ),
                None => unsupported(ctx, &format!("unresolved $ref {}", target)),
            }
        }
        SchemaKind::Unsupported(kind) => unsupported(ctx, kind),
    }
}

fn unsupported(ctx: &GenerationContext, kind: &str) -> Result<Value> {
    if ctx.strict {
        return Err(GenerationError::UnsupportedSchemaKind(kind.to_string()));
    }
    warn!("Unsupported schema kind '{}', emitting null", kind);
    Ok(Value::Null)
}

fn build_object(object: &ObjectSchema, ctx: &GenerationContext, cursor: Cursor) -> Result<Value> {
    let mut result = Map::new();

    for (prop_name, prop_schema) in &object.properties {
        match build(prop_schema, ctx, Some(prop_name), cursor) {
            Ok(value) => {
                result.insert(prop_name.clone(), value);
            }
            Err(GenerationError::DepthExceeded { depth, .. }) if !object.required.contains(prop_name) => {
                debug!("Omitting optional property '{}' nested at depth {}", prop_name, depth);
            }
            Err(e) => return Err(e),
        }
    }

    // Required names without a declared schema still have to be present
    for name in &object.required {
        if !result.contains_key(name) {
            result.insert(name.clone(), Value::String(placeholder_string(&StringSchema::default(), Some(name))));
        }
    }

    Ok(Value::Object(result))
}

fn build_array(array: &ArraySchema, ctx: &GenerationContext, name: Option<&str>, cursor: Cursor) -> Result<Value> {
    let lower = array.min_items.unwrap_or(1);
    let mut count = lower.max(1);
    if let Some(max) = array.max_items {
        count = count.min(max);
    }

    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        match build(&array.items, ctx, name, cursor) {
            Ok(value) => items.push(value),
            Err(GenerationError::DepthExceeded { depth, .. }) if lower == 0 => {
                debug!("Leaving array empty, items nested at depth {}", depth);
                return Ok(Value::Array(Vec::new()));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Value::Array(items))
}

fn placeholder_string(schema: &StringSchema, name: Option<&str>) -> String {
    let fixed = match schema.format.as_deref() {
        Some("email") => return email_placeholder(schema),
        Some("date-time") => PLACEHOLDER_DATE_TIME,
        Some("date") => PLACEHOLDER_DATE,
        Some("time") => "12:00:00",
        Some("uuid") => PLACEHOLDER_UUID,
        Some("uri") | Some("url") => "https://example.com/resource",
        Some("hostname") => "example.com",
        Some("ipv4") => "192.0.2.1",
        Some("ipv6") => "2001:db8::1",
        Some("password") => "P@ssw0rd123",
        Some("byte") => "ZXhhbXBsZQ==",
        _ => {
            let base = match name {
                Some(name) if !name.is_empty() => format!("sample_{}", name),
                _ => "sample".to_string(),
            };
            return fit_length(base, schema.min_length, schema.max_length);
        }
    };

    // Fixed-shape formats cannot satisfy every length range; bounds win
    fit_length(fixed.to_string(), schema.min_length, schema.max_length)
}

/// An address sized into the length bounds where one exists (`a@b.co` is the shortest)
fn email_placeholder(schema: &StringSchema) -> String {
    if within_length(schema, PLACEHOLDER_EMAIL.len()) {
        return PLACEHOLDER_EMAIL.to_string();
    }

    let wanted = match (schema.min_length, schema.max_length) {
        (Some(min), _) if min > PLACEHOLDER_EMAIL.len() => min,
        (_, Some(max)) => max,
        _ => PLACEHOLDER_EMAIL.len(),
    };
    let domain = if wanted > "@example.com".len() { "@example.com" } else { "@b.co" };
    if wanted <= domain.len() {
        return fit_length(PLACEHOLDER_EMAIL.to_string(), schema.min_length, schema.max_length);
    }

    let local_len = wanted - domain.len();
    let local = fit_length("user".to_string(), Some(local_len), Some(local_len));
    format!("{}{}", local, domain)
}

fn within_length(schema: &StringSchema, len: usize) -> bool {
    schema.min_length.map_or(true, |min| len >= min) && schema.max_length.map_or(true, |max| len <= max)
}

fn fit_length(mut text: String, min: Option<usize>, max: Option<usize>) -> String {
    let min = min.unwrap_or(0);
    let len = text.chars().count();
    if len < min {
        text.extend(std::iter::repeat('x').take(min - len));
    }
    if let Some(max) = max {
        if text.chars().count() > max {
            text = text.chars().take(max).collect();
        }
    }
    text
}

fn integer_value(bounds: &NumberSchema) -> i64 {
    let mut value = match bounds.minimum {
        Some(min) => {
            let lowest = min.ceil() as i64;
            if bounds.exclusive_minimum && lowest as f64 == min {
                lowest + 1
            } else {
                lowest
            }
        }
        None => 0,
    };

    if let Some(max) = bounds.maximum {
        let mut highest = max.floor() as i64;
        if bounds.exclusive_maximum && highest as f64 == max {
            highest -= 1;
        }
        if value > highest {
            value = highest;
        }
    }

    value
}

fn number_value(bounds: &NumberSchema) -> f64 {
    let mut value = match bounds.minimum {
        Some(min) if bounds.exclusive_minimum => min + 1.0,
        Some(min) => min,
        None => 0.0,
    };

    if let Some(max) = bounds.maximum {
        let too_high = if bounds.exclusive_maximum { value >= max } else { value > max };
        if too_high {
            value = match (bounds.minimum, bounds.exclusive_maximum) {
                (Some(min), _) => (min + max) / 2.0,
                (None, true) => max - 1.0,
                (None, false) => max,
            };
        }
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::validate;
    use crate::parser::Definitions;

    fn node(value: Value) -> SchemaNode {
        SchemaNode::from_value(&value)
    }

    fn generate(value: Value) -> Result<Value> {
        Generator::deterministic().generate(&node(value), &GenerationContext::deterministic())
    }

    fn nested_objects(levels: usize, required: bool) -> Value {
        let mut schema = json!({ "type": "string" });
        for _ in 0..levels {
            schema = if required {
                json!({ "type": "object", "required": ["child"], "properties": { "child": schema } })
            } else {
                json!({ "type": "object", "properties": { "child": schema } })
            };
        }
        schema
    }

    #[test]
    fn test_required_properties_are_present() {
        let value = generate(json!({
            "type": "object",
            "required": ["name", "email", "nickname"],
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string", "format": "email" },
                "age": { "type": "integer", "minimum": 0 }
            }
        }))
        .unwrap();

        let obj = value.as_object().unwrap();
        assert_eq!(obj["name"], "sample_name");
        assert_eq!(obj["email"], PLACEHOLDER_EMAIL);
        assert_eq!(obj["age"], 0);
        assert!(obj.contains_key("nickname"));
    }

    #[test]
    fn test_enum_first_element_for_every_kind() {
        assert_eq!(generate(json!({ "type": "string", "enum": ["b", "a"] })).unwrap(), "b");
        assert_eq!(generate(json!({ "type": "integer", "enum": [7, 3] })).unwrap(), 7);
        assert_eq!(generate(json!({ "type": "boolean", "enum": [false] })).unwrap(), false);
        assert_eq!(generate(json!({ "type": "string", "format": "email", "enum": ["x"] })).unwrap(), "x");
    }

    #[test]
    fn test_string_formats_are_syntactically_valid() {
        let defs = Definitions::new();
        for format in ["email", "date-time", "date", "uuid", "ipv4", "ipv6", "uri"] {
            let schema = node(json!({ "type": "string", "format": format }));
            let value = Generator::deterministic()
                .generate(&schema, &GenerationContext::deterministic())
                .unwrap();
            assert!(validate(&schema, &value, &defs), "{} produced {}", format, value);
        }
    }

    #[test]
    fn test_formats_respect_length_bounds() {
        let defs = Definitions::new();
        let cases = [
            json!({ "type": "string", "format": "email", "maxLength": 10 }),
            json!({ "type": "string", "format": "email", "maxLength": 6 }),
            json!({ "type": "string", "format": "email", "minLength": 30 }),
            json!({ "type": "string", "format": "email", "minLength": 8, "maxLength": 12 }),
            json!({ "type": "string", "format": "uri", "minLength": 40 }),
        ];
        for raw in cases {
            let schema = node(raw.clone());
            let value = Generator::deterministic()
                .generate(&schema, &GenerationContext::deterministic())
                .unwrap();
            assert!(validate(&schema, &value, &defs), "{} produced {}", raw, value);
        }

        assert_eq!(
            generate(json!({ "type": "string", "format": "email", "maxLength": 10 })).unwrap(),
            "userx@b.co"
        );
    }

    #[test]
    fn test_string_length_bounds() {
        assert_eq!(generate(json!({ "type": "string", "minLength": 10 })).unwrap(), "samplexxxx");
        assert_eq!(generate(json!({ "type": "string", "maxLength": 3 })).unwrap(), "sam");
    }

    #[test]
    fn test_numeric_bounds() {
        assert_eq!(generate(json!({ "type": "integer" })).unwrap(), 0);
        assert_eq!(generate(json!({ "type": "integer", "minimum": 5 })).unwrap(), 5);
        assert_eq!(generate(json!({ "type": "integer", "minimum": 5, "exclusiveMinimum": true })).unwrap(), 6);
        assert_eq!(generate(json!({ "type": "integer", "maximum": -3 })).unwrap(), -3);
        assert_eq!(generate(json!({ "type": "integer", "exclusiveMaximum": 0 })).unwrap(), -1);
        assert_eq!(generate(json!({ "type": "number", "minimum": 1.5 })).unwrap(), 1.5);
        assert_eq!(generate(json!({ "type": "number", "minimum": 1, "maximum": 2, "exclusiveMaximum": true, "exclusiveMinimum": true })).unwrap(), 1.5);
    }

    #[test]
    fn test_boolean_defaults_to_true() {
        assert_eq!(generate(json!({ "type": "boolean" })).unwrap(), true);
    }

    #[test]
    fn test_array_lengths() {
        let one = generate(json!({ "type": "array", "items": { "type": "integer" } })).unwrap();
        assert_eq!(one, json!([0]));

        let three = generate(json!({ "type": "array", "minItems": 3, "maxItems": 5, "items": { "type": "string" } })).unwrap();
        assert_eq!(three.as_array().unwrap().len(), 3);

        let capped = generate(json!({ "type": "array", "minItems": 0, "maxItems": 0, "items": { "type": "string" } })).unwrap();
        assert_eq!(capped, json!([]));
    }

    #[test]
    fn test_empty_object_is_valid() {
        assert_eq!(generate(json!({ "type": "object" })).unwrap(), json!({}));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let schema = node(json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "created": { "type": "string", "format": "date-time" }
            }
        }));
        let ctx = GenerationContext::deterministic();
        let generator = Generator::deterministic();
        assert_eq!(generator.generate(&schema, &ctx).unwrap(), generator.generate(&schema, &ctx).unwrap());
    }

    #[test]
    fn test_depth_exceeded_surfaces_at_root() {
        let schema = node(nested_objects(10, true));
        let ctx = GenerationContext::deterministic().with_max_depth(5);
        match Generator::deterministic().generate(&schema, &ctx) {
            Err(GenerationError::DepthExceeded { depth, max_depth }) => {
                assert_eq!(depth, 6);
                assert_eq!(max_depth, 5);
            }
            other => panic!("expected DepthExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_branches_are_pruned_at_depth() {
        let schema = node(nested_objects(4, false));
        let ctx = GenerationContext::deterministic().with_max_depth(2);
        let value = Generator::deterministic().generate(&schema, &ctx).unwrap();
        assert_eq!(value, json!({ "child": {} }));
    }

    #[test]
    fn test_self_referential_schema() {
        let mut definitions = Definitions::new();
        definitions.insert(
            "Category".into(),
            node(json!({
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": { "type": "string" },
                    "parent": { "$ref": "#/components/schemas/Category" },
                    "children": { "type": "array", "minItems": 0, "items": { "$ref": "#/components/schemas/Category" } }
                }
            })),
        );
        definitions.insert(
            "Loop".into(),
            node(json!({
                "type": "object",
                "required": ["next"],
                "properties": { "next": { "$ref": "#/components/schemas/Loop" } }
            })),
        );
        let ctx = GenerationContext::deterministic()
            .with_max_depth(3)
            .with_definitions(Arc::new(definitions));
        let generator = Generator::deterministic();

        let category = generator.generate(&node(json!({ "$ref": "#/definitions/Category" })), &ctx).unwrap();
        assert_eq!(category["name"], "sample_name");
        assert_eq!(category["parent"]["parent"]["name"], "sample_name");
        assert!(category["parent"]["parent"].get("parent").is_none());

        let looped = generator.generate(&node(json!({ "$ref": "#/definitions/Loop" })), &ctx);
        assert!(matches!(looped, Err(GenerationError::DepthExceeded { .. })));
    }

    #[test]
    fn test_unsupported_kinds_degrade_or_fail_in_strict_mode() {
        let schema = node(json!({
            "type": "object",
            "properties": {
                "choice": { "oneOf": [{ "type": "string" }, { "type": "integer" }] },
                "missing": { "$ref": "#/components/schemas/Nope" }
            }
        }));

        let lenient = Generator::deterministic()
            .generate(&schema, &GenerationContext::deterministic())
            .unwrap();
        assert_eq!(lenient, json!({ "choice": null, "missing": null }));

        let strict = Generator::deterministic().generate(&schema, &GenerationContext::deterministic().with_strict(true));
        assert!(matches!(strict, Err(GenerationError::UnsupportedSchemaKind(kind)) if kind == "oneOf"));
    }

    #[test]
    fn test_assisted_mode_without_provider_is_deterministic() {
        let schema = node(json!({ "type": "string", "format": "email" }));
        let ctx = GenerationContext::assisted(crate::generator::ProviderKind::OpenAi);
        assert_eq!(Generator::deterministic().generate(&schema, &ctx).unwrap(), PLACEHOLDER_EMAIL);
    }
}
