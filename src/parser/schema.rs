// src/parser/schema.rs

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Named schemas from `components/schemas` (OpenAPI 3) or `definitions` (Swagger 2.0)
pub type Definitions = BTreeMap<String, SchemaNode>;

const REF_PREFIXES: [&str; 2] = ["#/components/schemas/", "#/definitions/"];

/// Longest chain of `$ref` hops followed before a reference is treated as circular
pub(crate) const MAX_REF_HOPS: usize = 32;

/// A single node of a JSON-Schema-like description
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// What kind of value this node describes
    pub kind: SchemaKind,

    /// Allowed literal values, in declaration order
    pub enum_values: Vec<Value>,

    /// Free-text description, forwarded to assisted generation
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String(StringSchema),
    Integer(NumberSchema),
    Number(NumberSchema),
    Boolean,
    Object(ObjectSchema),
    Array(ArraySchema),
    /// Reference to a named schema, resolved lazily against [`Definitions`]
    Ref(String),
    /// Anything outside the supported subset; carries the offending keyword or type
    Unsupported(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    pub format: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub properties: BTreeMap<String, SchemaNode>,
    pub required: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: Box<SchemaNode>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        SchemaNode {
            kind,
            enum_values: Vec::new(),
            description: None,
        }
    }

    /// Build a node from a raw schema fragment.
    ///
    /// Never fails: fragments outside the supported subset become
    /// [`SchemaKind::Unsupported`] so the generator can decide how to degrade.
    pub fn from_value(value: &Value) -> Self {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => return SchemaNode::new(SchemaKind::Unsupported(describe_non_schema(value))),
        };

        let enum_values = obj
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);

        let kind = if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            match ref_name(reference) {
                Some(name) => SchemaKind::Ref(name.to_string()),
                None => SchemaKind::Unsupported(format!("$ref {}", reference)),
            }
        } else {
            match declared_type(obj) {
                Some("string") => SchemaKind::String(StringSchema {
                    format: obj.get("format").and_then(Value::as_str).map(String::from),
                    min_length: get_usize(obj, "minLength"),
                    max_length: get_usize(obj, "maxLength"),
                    pattern: obj.get("pattern").and_then(Value::as_str).map(String::from),
                }),
                Some("integer") => SchemaKind::Integer(parse_bounds(obj)),
                Some("number") => SchemaKind::Number(parse_bounds(obj)),
                Some("boolean") => SchemaKind::Boolean,
                Some("array") => SchemaKind::Array(ArraySchema {
                    items: Box::new(
                        obj.get("items")
                            .map(SchemaNode::from_value)
                            .unwrap_or_else(|| SchemaNode::new(SchemaKind::Object(ObjectSchema::default()))),
                    ),
                    min_items: get_usize(obj, "minItems"),
                    max_items: get_usize(obj, "maxItems"),
                }),
                Some("object") => SchemaKind::Object(parse_object(obj)),
                Some(other) => SchemaKind::Unsupported(other.to_string()),
                None => infer_kind(obj, &enum_values),
            }
        };

        SchemaNode {
            kind,
            enum_values,
            description,
        }
    }

    /// Short name of the node's kind, as it appears in a schema's `type`
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            SchemaKind::String(_) => "string",
            SchemaKind::Integer(_) => "integer",
            SchemaKind::Number(_) => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Object(_) => "object",
            SchemaKind::Array(_) => "array",
            SchemaKind::Ref(_) => "$ref",
            SchemaKind::Unsupported(kind) => kind,
        }
    }

    /// Follow `$ref` nodes until a concrete node is reached
    pub fn resolve<'a>(&'a self, definitions: &'a Definitions) -> Option<&'a SchemaNode> {
        let mut node = self;
        for _ in 0..MAX_REF_HOPS {
            match &node.kind {
                SchemaKind::Ref(name) => node = definitions.get(name)?,
                _ => return Some(node),
            }
        }
        None
    }

    /// Render the node back into a JSON Schema fragment with references inlined.
    ///
    /// Self-referential branches are cut after `max_inline` expansions and left as `$ref`.
    pub fn to_json(&self, definitions: &Definitions, max_inline: usize) -> Value {
        let mut out = match &self.kind {
            SchemaKind::String(s) => {
                let mut map = type_map("string");
                insert_opt(&mut map, "format", s.format.as_ref().map(|f| json!(f)));
                insert_opt(&mut map, "minLength", s.min_length.map(|n| json!(n)));
                insert_opt(&mut map, "maxLength", s.max_length.map(|n| json!(n)));
                insert_opt(&mut map, "pattern", s.pattern.as_ref().map(|p| json!(p)));
                map
            }
            SchemaKind::Integer(b) => bounds_map("integer", b),
            SchemaKind::Number(b) => bounds_map("number", b),
            SchemaKind::Boolean => type_map("boolean"),
            SchemaKind::Object(o) => {
                let mut map = type_map("object");
                let properties: Map<String, Value> = o
                    .properties
                    .iter()
                    .map(|(name, child)| (name.clone(), child.to_json(definitions, max_inline)))
                    .collect();
                map.insert("properties".into(), Value::Object(properties));
                if !o.required.is_empty() {
                    map.insert("required".into(), json!(o.required));
                }
                map
            }
            SchemaKind::Array(a) => {
                let mut map = type_map("array");
                map.insert("items".into(), a.items.to_json(definitions, max_inline));
                insert_opt(&mut map, "minItems", a.min_items.map(|n| json!(n)));
                insert_opt(&mut map, "maxItems", a.max_items.map(|n| json!(n)));
                map
            }
            SchemaKind::Ref(name) => match definitions.get(name) {
                Some(target) if max_inline > 0 => return target.to_json(definitions, max_inline - 1),
                _ => {
                    let mut map = Map::new();
                    map.insert("$ref".into(), json!(format!("#/components/schemas/{}", name)));
                    map
                }
            },
            SchemaKind::Unsupported(_) => Map::new(),
        };

        if !self.enum_values.is_empty() {
            out.insert("enum".into(), Value::Array(self.enum_values.clone()));
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        Value::Object(out)
    }
}

/// Extract the schema name from a local `$ref`
pub fn ref_name(reference: &str) -> Option<&str> {
    REF_PREFIXES
        .iter()
        .find_map(|prefix| reference.strip_prefix(prefix))
        .filter(|name| !name.is_empty())
}

/// Read the `type` keyword, including the OpenAPI 3.1 list form (`["string", "null"]`)
fn declared_type(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .or(Some("null")),
        _ => None,
    }
}

fn infer_kind(obj: &Map<String, Value>, enum_values: &[Value]) -> SchemaKind {
    for keyword in ["oneOf", "anyOf", "allOf", "not"] {
        if obj.contains_key(keyword) {
            return SchemaKind::Unsupported(keyword.to_string());
        }
    }

    if obj.contains_key("items") {
        let mut typed = obj.clone();
        typed.insert("type".into(), json!("array"));
        return SchemaNode::from_value(&Value::Object(typed)).kind;
    }

    match enum_values.first() {
        Some(Value::String(_)) => SchemaKind::String(StringSchema::default()),
        Some(Value::Bool(_)) => SchemaKind::Boolean,
        Some(Value::Number(n)) if n.is_f64() => SchemaKind::Number(NumberSchema::default()),
        Some(Value::Number(_)) => SchemaKind::Integer(NumberSchema::default()),
        _ => SchemaKind::Object(parse_object(obj)),
    }
}

fn parse_object(obj: &Map<String, Value>) -> ObjectSchema {
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, schema)| (name.clone(), SchemaNode::from_value(schema)))
                .collect()
        })
        .unwrap_or_default();

    let required = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();

    ObjectSchema { properties, required }
}

fn parse_bounds(obj: &Map<String, Value>) -> NumberSchema {
    let mut bounds = NumberSchema {
        minimum: obj.get("minimum").and_then(Value::as_f64),
        maximum: obj.get("maximum").and_then(Value::as_f64),
        exclusive_minimum: false,
        exclusive_maximum: false,
    };

    // 3.0 uses booleans next to minimum/maximum, 3.1 uses the bound itself
    match obj.get("exclusiveMinimum") {
        Some(Value::Bool(flag)) => bounds.exclusive_minimum = *flag,
        Some(Value::Number(n)) => {
            bounds.minimum = n.as_f64();
            bounds.exclusive_minimum = true;
        }
        _ => {}
    }
    match obj.get("exclusiveMaximum") {
        Some(Value::Bool(flag)) => bounds.exclusive_maximum = *flag,
        Some(Value::Number(n)) => {
            bounds.maximum = n.as_f64();
            bounds.exclusive_maximum = true;
        }
        _ => {}
    }

    bounds
}

fn get_usize(obj: &Map<String, Value>, key: &str) -> Option<usize> {
    obj.get(key).and_then(Value::as_u64).map(|n| n as usize)
}

fn describe_non_schema(value: &Value) -> String {
    match value {
        Value::Bool(_) => "boolean schema".to_string(),
        Value::Null => "null schema".to_string(),
        _ => "non-object schema".to_string(),
    }
}

fn type_map(kind: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".into(), json!(kind));
    map
}

fn bounds_map(kind: &str, bounds: &NumberSchema) -> Map<String, Value> {
    let mut map = type_map(kind);
    insert_opt(&mut map, "minimum", bounds.minimum.map(|n| json!(n)));
    insert_opt(&mut map, "maximum", bounds.maximum.map(|n| json!(n)));
    if bounds.exclusive_minimum {
        map.insert("exclusiveMinimum".into(), json!(true));
    }
    if bounds.exclusive_maximum {
        map.insert("exclusiveMaximum".into(), json!(true));
    }
    map
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}
