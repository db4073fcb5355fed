// src/generator/assisted.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::context::GenerationContext;
use super::validate::validate;
use crate::parser::{SchemaKind, SchemaNode};

/// Number of `$ref` expansions inlined into the schema sent to a provider
const PROMPT_REF_DEPTH: usize = 4;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

pub const SYSTEM_PROMPT: &str =
    "You are a helpful API test data generator that creates realistic test data based on OpenAPI schemas.";

/// Why a completion provider could not supply a usable value.
///
/// Never surfaced to callers: any of these makes the generator fall back to
/// deterministic rules.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("No API key available: {0}")]
    MissingApiKey(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AssistError {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            AssistError::Timeout | AssistError::Unreachable(_) => true,
            AssistError::Api { status, .. } => *status == 429 || *status >= 500,
            AssistError::MissingApiKey(_) | AssistError::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for AssistError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AssistError::Timeout
        } else if let Some(status) = err.status() {
            AssistError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            AssistError::InvalidResponse(err.to_string())
        } else {
            AssistError::Unreachable(err.to_string())
        }
    }
}

/// What a completion provider is asked for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistRequest {
    /// JSON Schema of the value wanted, references inlined
    pub schema: Value,

    /// "METHOD /path" of the endpoint
    pub endpoint: Option<String>,

    /// Property or parameter name the value is for
    pub name: Option<String>,

    /// Free-text description of the endpoint's purpose
    pub hint: Option<String>,
}

impl AssistRequest {
    pub fn prompt(&self) -> String {
        let mut prompt = String::from("Generate a realistic test value for the following API input.\n\n");

        if let Some(endpoint) = &self.endpoint {
            prompt.push_str(&format!("Endpoint: {}\n", endpoint));
        }
        if let Some(name) = &self.name {
            prompt.push_str(&format!("Field: {}\n", name));
        }
        if let Some(hint) = &self.hint {
            prompt.push_str(&format!("Purpose: {}\n", hint));
        }

        let schema = serde_json::to_string_pretty(&self.schema).unwrap_or_else(|_| self.schema.to_string());
        prompt.push_str(&format!("\nSchema:\n{}\n\n", schema));
        prompt.push_str(
            "The value must satisfy the schema and be realistic for this endpoint.\n\
             Only return valid JSON without any explanation or surrounding text.",
        );
        prompt
    }
}

/// Narrow interface to an external text-completion service
pub trait CompletionProvider: Send + Sync {
    /// Provider identity, e.g. "openai"
    fn name(&self) -> &str;

    /// Submit one request; must give up after `timeout`
    fn submit(&self, request: &AssistRequest, timeout: Duration) -> Result<String, AssistError>;
}

/// Connection settings for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub model: String,

    /// Override of the provider's API root, e.g. for a proxy
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Explicit API key; takes precedence over `api_key_env`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub max_tokens: u32,

    pub temperature: f32,
}

impl ProviderSettings {
    pub fn openai() -> Self {
        ProviderSettings {
            model: "gpt-4".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            max_tokens: 2000,
            temperature: 0.7,
        }
    }

    pub fn anthropic() -> Self {
        ProviderSettings {
            model: "claude-3-opus-20240229".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            ..ProviderSettings::openai()
        }
    }

    /// The explicit key, else the configured environment variable
    pub fn resolve_api_key(&self) -> Result<String, AssistError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AssistError::MissingApiKey(format!("{} not found in environment variables", self.api_key_env)))
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings::openai()
    }
}

/// Settings for assisted generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistSettings {
    pub openai: ProviderSettings,

    pub anthropic: ProviderSettings,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Extra attempts after a transient failure
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds, doubled on each further retry
    pub retry_delay_ms: u64,
}

impl Default for AssistSettings {
    fn default() -> Self {
        AssistSettings {
            openai: ProviderSettings::openai(),
            anthropic: ProviderSettings::anthropic(),
            timeout_ms: 20_000,
            max_retries: 2,
            retry_delay_ms: 250,
        }
    }
}

/// A provider plus the policy for calling it
pub struct Assistant {
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl Assistant {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: &AssistSettings) -> Self {
        Assistant {
            provider,
            timeout: Duration::from_millis(settings.timeout_ms),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the provider for a value and keep it only if it satisfies `node`
    pub fn suggest(&self, node: &SchemaNode, ctx: &GenerationContext, name: Option<&str>) -> Result<Value, AssistError> {
        let request = AssistRequest {
            schema: node.to_json(&ctx.definitions, PROMPT_REF_DEPTH),
            endpoint: ctx.endpoint.clone(),
            name: name.map(String::from),
            hint: ctx.hint.clone(),
        };

        let reply = self.submit_with_retries(&request)?;
        let candidate = parse_candidate(&reply, node, ctx)?;

        if validate(node, &candidate, &ctx.definitions) {
            debug!("Accepted value from {}", self.provider.name());
            Ok(candidate)
        } else {
            Err(AssistError::InvalidResponse(format!(
                "candidate does not satisfy the {} schema",
                node.kind_name()
            )))
        }
    }

    fn submit_with_retries(&self, request: &AssistRequest) -> Result<String, AssistError> {
        let mut attempt = 0;
        loop {
            match self.provider.submit(request, self.timeout) {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = backoff(self.retry_delay, attempt);
                    info!(
                        "{} request failed ({}), retrying in {:?}",
                        self.provider.name(),
                        e,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Delay before retry number `attempt` (0-based): doubles each time, capped
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_RETRY_DELAY)
}

/// Turn a provider reply into a JSON value.
///
/// Markdown code fences are stripped. Text that is not JSON is only accepted
/// when the schema asks for a string.
pub fn parse_candidate(reply: &str, node: &SchemaNode, ctx: &GenerationContext) -> Result<Value, AssistError> {
    let text = strip_code_fence(reply.trim());

    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(e) => {
            let wants_string = node
                .resolve(&ctx.definitions)
                .map_or(false, |n| matches!(n.kind, SchemaKind::String(_)));
            if wants_string && !text.is_empty() {
                Ok(Value::String(text.to_string()))
            } else {
                Err(AssistError::InvalidResponse(format!("reply is not JSON: {}", e)))
            }
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let inner = match text.strip_prefix("```") {
        Some(rest) => rest,
        None => return text,
    };
    // Drop the language tag on the opening fence line
    let inner = match inner.find('\n') {
        Some(newline) => &inner[newline + 1..],
        None => inner,
    };
    inner.trim_end().trim_end_matches("```").trim()
}
