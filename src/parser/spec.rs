// src/parser/spec.rs

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::schema::{Definitions, SchemaKind, SchemaNode, StringSchema};

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid OpenAPI specification: {0}")]
    InvalidSpec(String),

    #[error("Endpoint not found: {method} {path}")]
    EndpointNotFound { method: String, path: String },
}

impl SpecError {
    /// True for the errors raised while reading a document, as opposed to lookups
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, SpecError::EndpointNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SpecError>;

const PREFERRED_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "options" => Ok(HttpMethod::Options),
            "head" => Ok(HttpMethod::Head),
            "trace" => Ok(HttpMethod::Trace),
            other => Err(format!("unknown HTTP method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger2,
    OpenApi3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl FromStr for ParameterLocation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "path" => Ok(ParameterLocation::Path),
            "query" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            "cookie" => Ok(ParameterLocation::Cookie),
            other => Err(format!("unsupported parameter location: {}", other)),
        }
    }
}

/// A parameter of an API operation
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Name of the parameter
    pub name: String,

    /// Where the parameter travels
    pub location: ParameterLocation,

    /// Whether the parameter is required
    pub required: bool,

    /// Shape of the parameter value
    pub schema: SchemaNode,
}

/// Request body of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub content_type: String,
    pub required: bool,
    pub schema: SchemaNode,
}

/// A declared response of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code, or `default`
    pub status_code: String,

    /// Description of the response
    pub description: Option<String>,

    /// Schema of the response body
    pub schema: Option<SchemaNode>,
}

/// An API operation: one HTTP method on one path template
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// The path template (e.g., "/users/{id}")
    pub path: String,

    pub method: HttpMethod,

    /// Operation ID from the document, or generated if not present
    pub operation_id: String,

    pub summary: Option<String>,

    pub description: Option<String>,

    pub parameters: Vec<Parameter>,

    pub request_body: Option<RequestBody>,

    pub responses: Vec<ApiResponse>,
}

impl Endpoint {
    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }

    /// Schema of the success response: 200, then 201, then any other 2xx
    pub fn success_response(&self) -> Option<&ApiResponse> {
        let with_schema = || self.responses.iter().filter(|r| r.schema.is_some());
        with_schema()
            .find(|r| r.status_code == "200")
            .or_else(|| with_schema().find(|r| r.status_code == "201"))
            .or_else(|| with_schema().find(|r| r.status_code.starts_with('2')))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EndpointKey {
    path: String,
    method: HttpMethod,
}

/// In-memory index of a parsed Swagger/OpenAPI specification
#[derive(Debug, Clone)]
pub struct SpecIndex {
    pub version: SpecVersion,

    /// Base URL for the API derived from the specification
    pub base_url: String,

    endpoints: BTreeMap<EndpointKey, Endpoint>,
    definitions: Arc<Definitions>,
}

impl SpecIndex {
    /// Parse a Swagger/OpenAPI specification from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SpecIndex> {
        let mut file = File::open(path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;

        SpecIndex::load(&content)
    }

    /// Parse a Swagger/OpenAPI specification from JSON or YAML text
    pub fn load(document: &str) -> Result<SpecIndex> {
        let spec = parse_document(document)?;
        if !spec.is_object() {
            return Err(SpecError::InvalidSpec("document root is not a mapping".into()));
        }

        let swagger_version = spec.get("swagger").and_then(version_marker);
        let openapi_version = spec.get("openapi").and_then(version_marker);

        let version = match (swagger_version.as_deref(), openapi_version.as_deref()) {
            (Some("2.0") | Some("2"), _) => SpecVersion::Swagger2,
            (_, Some(v)) if v == "3" || v.starts_with("3.") => SpecVersion::OpenApi3,
            (Some(v), _) | (_, Some(v)) => return Err(SpecError::UnsupportedVersion(v.to_string())),
            (None, None) => {
                debug!("No version marker found, reading document with the OpenAPI 3 layout");
                SpecVersion::OpenApi3
            }
        };

        let paths = match spec.get("paths").and_then(Value::as_object) {
            Some(paths) => paths,
            None => return Err(SpecError::InvalidSpec("No paths defined".into())),
        };

        let definitions = match version {
            SpecVersion::Swagger2 => spec.get("definitions"),
            SpecVersion::OpenApi3 => spec.get("components").and_then(|c| c.get("schemas")),
        }
        .and_then(Value::as_object)
        .map(|defs| {
            defs.iter()
                .map(|(name, schema)| (name.clone(), SchemaNode::from_value(schema)))
                .collect::<Definitions>()
        })
        .unwrap_or_default();

        let mut endpoints = BTreeMap::new();
        for (path, path_item) in paths {
            let path_obj = match path_item.as_object() {
                Some(obj) => obj,
                None => continue,
            };

            let shared_params = path_obj
                .get("parameters")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            for (method, operation) in path_obj {
                // Skip non-HTTP method keys
                let method = match method.parse::<HttpMethod>() {
                    Ok(method) => method,
                    Err(_) => continue,
                };

                if let Some(op_obj) = operation.as_object() {
                    let endpoint = parse_operation(version, path, method, op_obj, shared_params);
                    endpoints.insert(
                        EndpointKey {
                            path: path.clone(),
                            method,
                        },
                        endpoint,
                    );
                }
            }
        }

        debug!("Indexed {} endpoints and {} schemas", endpoints.len(), definitions.len());

        Ok(SpecIndex {
            version,
            base_url: base_url(version, &spec),
            endpoints,
            definitions: Arc::new(definitions),
        })
    }

    /// Find the endpoint declared for a path template and method.
    ///
    /// Placeholder segments match each other regardless of their names, so a
    /// caller asking for `/users/{userId}` finds `/users/{id}`.
    pub fn lookup(&self, path: &str, method: &str) -> Result<&Endpoint> {
        let not_found = || SpecError::EndpointNotFound {
            method: method.to_uppercase(),
            path: path.to_string(),
        };
        let method: HttpMethod = method.parse().map_err(|_| not_found())?;

        let key = EndpointKey {
            path: path.to_string(),
            method,
        };
        if let Some(endpoint) = self.endpoints.get(&key) {
            return Ok(endpoint);
        }

        let wanted = template_segments(path);
        self.endpoints
            .values()
            .find(|e| e.method == method && template_segments(&e.path) == wanted)
            .ok_or_else(not_found)
    }

    /// All endpoints, ordered by path then method
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    pub fn definitions(&self) -> &Arc<Definitions> {
        &self.definitions
    }
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder,
}

/// Version marker as text; unquoted YAML (`swagger: 2.0`) reads it as a number
fn version_marker(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => Some(format!("{:.1}", f)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

fn template_segments(path: &str) -> Vec<Segment<'_>> {
    path.trim_end_matches('/')
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                Segment::Placeholder
            } else {
                Segment::Literal(segment)
            }
        })
        .collect()
}

fn parse_document(content: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            let trimmed = content.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                return Err(json_err.into());
            }
            let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
            Ok(yaml_to_json(yaml))
        }
    }
}

/// YAML allows non-string keys (`200:` under `responses`); JSON keys are always strings
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => match yaml_to_json(other) {
                        Value::String(s) => s,
                        converted => converted.to_string(),
                    },
                };
                map.insert(key, yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn base_url(version: SpecVersion, spec: &Value) -> String {
    match version {
        SpecVersion::Swagger2 => {
            let scheme = spec
                .get("schemes")
                .and_then(Value::as_array)
                .and_then(|a| a.first())
                .and_then(Value::as_str)
                .unwrap_or("http");

            let host = spec.get("host").and_then(Value::as_str).unwrap_or("localhost");

            let base_path = spec.get("basePath").and_then(Value::as_str).unwrap_or("");

            format!("{}://{}{}", scheme, host, base_path)
        }
        SpecVersion::OpenApi3 => spec
            .get("servers")
            .and_then(Value::as_array)
            .and_then(|servers| servers.first())
            .and_then(|server| server.get("url"))
            .and_then(Value::as_str)
            .unwrap_or("http://localhost")
            .to_string(),
    }
}

fn parse_operation(
    version: SpecVersion,
    path: &str,
    method: HttpMethod,
    op_obj: &Map<String, Value>,
    shared_params: &[Value],
) -> Endpoint {
    let operation_id = op_obj
        .get("operationId")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("{}_{}", method.as_str().to_lowercase(), sanitize_path(path)));

    let summary = op_obj.get("summary").and_then(Value::as_str).map(String::from);

    let description = op_obj.get("description").and_then(Value::as_str).map(String::from);

    let mut parameters: Vec<Parameter> = Vec::new();
    let mut request_body = None;

    let own_params = op_obj
        .get("parameters")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    // Operation-level parameters override path-level ones with the same name and location
    for param in own_params.iter().chain(shared_params) {
        let param_obj = match param.as_object() {
            Some(obj) => obj,
            None => continue,
        };

        let name = param_obj.get("name").and_then(Value::as_str).unwrap_or("").to_string();
        let location = param_obj.get("in").and_then(Value::as_str).unwrap_or("");
        let required = param_obj.get("required").and_then(Value::as_bool).unwrap_or(false)
            || location == "path";

        if location == "body" {
            if request_body.is_none() {
                request_body = Some(RequestBody {
                    content_type: PREFERRED_CONTENT_TYPE.to_string(),
                    required,
                    schema: param_obj
                        .get("schema")
                        .map(SchemaNode::from_value)
                        .unwrap_or_else(|| SchemaNode::from_value(&Value::Object(Map::new()))),
                });
            }
            continue;
        }

        let location = match location.parse::<ParameterLocation>() {
            Ok(location) => location,
            Err(e) => {
                debug!("Skipping parameter {} on {} {}: {}", name, method, path, e);
                continue;
            }
        };

        if parameters.iter().any(|p| p.name == name && p.location == location) {
            continue;
        }

        parameters.push(Parameter {
            name,
            location,
            required,
            schema: parameter_schema(param_obj),
        });
    }

    if version == SpecVersion::OpenApi3 {
        request_body = op_obj.get("requestBody").and_then(parse_request_body);
    }

    let mut responses = Vec::new();

    if let Some(resp_obj) = op_obj.get("responses").and_then(Value::as_object) {
        for (status_code, response) in resp_obj {
            if let Some(resp_obj) = response.as_object() {
                let description = resp_obj.get("description").and_then(Value::as_str).map(String::from);

                let schema = match version {
                    SpecVersion::Swagger2 => resp_obj.get("schema"),
                    SpecVersion::OpenApi3 => resp_obj
                        .get("content")
                        .and_then(Value::as_object)
                        .and_then(pick_media_type)
                        .and_then(|(_, media)| media.get("schema")),
                }
                .map(SchemaNode::from_value);

                responses.push(ApiResponse {
                    status_code: status_code.clone(),
                    description,
                    schema,
                });
            }
        }
    }

    Endpoint {
        path: path.to_string(),
        method,
        operation_id,
        summary,
        description,
        parameters,
        request_body,
        responses,
    }
}

/// OpenAPI 3 parameters carry a `schema`; Swagger 2.0 ones describe the value inline
fn parameter_schema(param_obj: &Map<String, Value>) -> SchemaNode {
    if let Some(schema) = param_obj.get("schema") {
        return SchemaNode::from_value(schema);
    }

    if param_obj.contains_key("type") {
        let mut inline = param_obj.clone();
        for key in ["name", "in", "required", "description"] {
            inline.remove(key);
        }
        return SchemaNode::from_value(&Value::Object(inline));
    }

    SchemaNode::new(SchemaKind::String(StringSchema::default()))
}

fn parse_request_body(body: &Value) -> Option<RequestBody> {
    let required = body.get("required").and_then(Value::as_bool).unwrap_or(false);

    let content = body.get("content")?.as_object()?;
    let (content_type, media) = pick_media_type(content)?;

    Some(RequestBody {
        content_type: content_type.to_string(),
        required,
        schema: media
            .get("schema")
            .map(SchemaNode::from_value)
            .unwrap_or_else(|| SchemaNode::from_value(&Value::Object(Map::new()))),
    })
}

/// Prefer `application/json`, otherwise take the first declared content type
fn pick_media_type(content: &Map<String, Value>) -> Option<(&str, &Value)> {
    content
        .get_key_value(PREFERRED_CONTENT_TYPE)
        .or_else(|| content.iter().next())
        .map(|(content_type, media)| (content_type.as_str(), media))
}

/// Helper function to sanitize path for use in operation IDs
fn sanitize_path(path: &str) -> String {
    path.replace('/', "_")
        .replace('{', "")
        .replace('}', "")
        .trim_start_matches('_')
        .to_string()
}
