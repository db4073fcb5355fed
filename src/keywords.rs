// src/keywords.rs
//
// Test-automation keywords: load a specification, generate test data for an
// endpoint, send requests and assert on the responses.

use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::generator::{AssistSettings, GenerationContext, GenerationError, GenerationMode, TestDataGenerator};
use crate::parser::{SpecError, SpecIndex};
use crate::utils::write_to_file;

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("API specification must be loaded first using 'Load API Specification' keyword")]
    SpecificationNotLoaded,

    #[error("Base URL must be set first using 'Set Base URL' keyword")]
    BaseUrlNotSet,

    #[error("No request has been made yet")]
    NoResponse,

    #[error("Response is not valid JSON")]
    InvalidJson,

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("{0}")]
    Assertion(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

pub type Result<T> = std::result::Result<T, KeywordError>;

/// Status and body of the last response received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResponse {
    pub status: u16,
    pub body: String,
}

impl RecordedResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|_| KeywordError::InvalidJson)
    }
}

/// Keyword library state: one loaded specification, one base URL, the
/// current test data and the last response
pub struct ApiTestingLibrary {
    base_url: Option<String>,
    client: Client,
    settings: AssistSettings,
    generator: Option<TestDataGenerator>,
    test_data: Value,
    last_response: Option<RecordedResponse>,
}

impl Default for ApiTestingLibrary {
    fn default() -> Self {
        ApiTestingLibrary::new(None)
    }
}

impl ApiTestingLibrary {
    pub fn new(base_url: Option<String>) -> Self {
        ApiTestingLibrary {
            base_url,
            client: Client::new(),
            settings: AssistSettings::default(),
            generator: None,
            test_data: Value::Null,
            last_response: None,
        }
    }

    pub fn with_assist_settings(mut self, settings: AssistSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn test_data(&self) -> &Value {
        &self.test_data
    }

    pub fn last_response(&self) -> Option<&RecordedResponse> {
        self.last_response.as_ref()
    }

    /// Load and parse the OpenAPI specification file
    pub fn load_api_specification<P: AsRef<Path>>(&mut self, spec_file_path: P) -> Result<String> {
        let spec_file_path = spec_file_path.as_ref();
        let index = SpecIndex::from_file(spec_file_path)?;
        self.generator = Some(TestDataGenerator::new(Arc::new(index), self.settings.clone()));
        Ok(format!("API specification loaded from {}", spec_file_path.display()))
    }

    pub fn set_base_url(&mut self, base_url: &str) -> String {
        self.base_url = Some(base_url.to_string());
        format!("Base URL set to {}", base_url)
    }

    /// Load test data from a JSON file
    pub fn load_test_data_from_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<String> {
        let file_path = file_path.as_ref();
        let content = fs::read_to_string(file_path)?;
        self.test_data = serde_json::from_str(&content)?;
        Ok(format!("Test data loaded from {}", file_path.display()))
    }

    /// Generate test data for an endpoint, keep it as the current test data and
    /// optionally save it; returns the pretty-printed JSON
    pub fn generate_test_data_for_endpoint(
        &mut self,
        endpoint_path: &str,
        method: &str,
        mode: GenerationMode,
        save_to_file: Option<&Path>,
    ) -> Result<String> {
        let generator = self.generator.as_ref().ok_or(KeywordError::SpecificationNotLoaded)?;

        info!("Generating test data for {} {} ({:?})", method.to_uppercase(), endpoint_path, mode);
        let ctx = GenerationContext::default().with_mode(mode);
        let data = generator.generate_for_endpoint(endpoint_path, method, &ctx)?;
        let pretty = data.to_json_pretty()?;
        self.test_data = serde_json::to_value(&data)?;

        if let Some(path) = save_to_file {
            write_to_file(path, &pretty)?;
            info!("Test data saved to {}", path.display());
        }

        Ok(pretty)
    }

    /// Send a request to `endpoint` under the base URL.
    ///
    /// Without an explicit body, the `body` of the current test data is sent.
    pub fn make_request(
        &mut self,
        method: &str,
        endpoint: &str,
        body: Option<Value>,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<&RecordedResponse> {
        let base_url = self.base_url.as_deref().ok_or(KeywordError::BaseUrlNotSet)?;
        let url = format!("{}/{}", base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'));

        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| KeywordError::InvalidMethod(method.to_string()))?;

        let body = body.or_else(|| match self.test_data.get("body") {
            Some(Value::Null) | None => None,
            Some(stored) => Some(stored.clone()),
        });

        info!("Making {} request to {}", method, url);

        let mut request = self.client.request(method, &url).query(params);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = &body {
            info!("Request data: {}", body);
            request = request.json(body);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let text = response.text()?;
        info!("Response ({}): {}", status, text);

        Ok(&*self.last_response.insert(RecordedResponse { status, body: text }))
    }

    /// Verify that the response status code matches the expected value
    pub fn response_status_code_should_be(&self, expected_status_code: u16) -> Result<String> {
        let response = self.last_response.as_ref().ok_or(KeywordError::NoResponse)?;

        if response.status != expected_status_code {
            return Err(KeywordError::Assertion(format!(
                "Expected status code {}, but got {}",
                expected_status_code, response.status
            )));
        }

        Ok(format!("Response status code is {} as expected", response.status))
    }

    /// Verify that the response contains a property; `property_path` is dotted
    /// and may contain list indices, e.g. `items.0.id`
    pub fn response_should_contain_property(&self, property_path: &str) -> Result<String> {
        let json = self.last_response.as_ref().ok_or(KeywordError::NoResponse)?.json()?;
        navigate(&json, property_path)?;
        Ok(format!("Property '{}' found in response", property_path))
    }

    /// Verify that a response property equals `expected_value`, which is read as
    /// a number, boolean or string depending on the actual value
    pub fn response_property_should_equal(&self, property_path: &str, expected_value: &str) -> Result<String> {
        let json = self.last_response.as_ref().ok_or(KeywordError::NoResponse)?.json()?;
        let actual = navigate(&json, property_path)?;

        if !matches_literal(actual, expected_value) {
            return Err(KeywordError::Assertion(format!(
                "Property '{}' value '{}' does not match expected '{}'",
                property_path, display_value(actual), expected_value
            )));
        }

        Ok(format!("Property '{}' has expected value '{}'", property_path, expected_value))
    }
}

fn navigate<'a>(root: &'a Value, property_path: &str) -> Result<&'a Value> {
    let mut current = root;
    for prop in property_path.split('.') {
        current = match current {
            Value::Array(items) => prop
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx))
                .ok_or_else(|| {
                    KeywordError::Assertion(format!("List index '{}' not found in response at this level", prop))
                })?,
            Value::Object(map) => map.get(prop).ok_or_else(|| {
                KeywordError::Assertion(format!("Property '{}' not found in response", property_path))
            })?,
            _ => {
                return Err(KeywordError::Assertion(format!(
                    "Property '{}' not found in response",
                    property_path
                )))
            }
        };
    }
    Ok(current)
}

fn matches_literal(actual: &Value, expected: &str) -> bool {
    let expected = expected.trim();
    match actual {
        Value::String(s) => s == expected,
        Value::Number(n) => match (n.as_f64(), expected.parse::<f64>()) {
            (Some(actual), Ok(expected)) => actual == expected,
            _ => false,
        },
        Value::Bool(b) => expected.parse::<bool>().map_or(false, |e| e == *b),
        Value::Null => expected == "null" || expected.is_empty(),
        _ => serde_json::from_str::<Value>(expected).map_or(false, |e| &e == actual),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
