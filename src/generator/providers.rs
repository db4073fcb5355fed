// src/generator/providers.rs
//
// Blocking HTTP clients for the completion services used in assisted mode.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::assisted::{AssistError, AssistRequest, AssistSettings, CompletionProvider, ProviderSettings, SYSTEM_PROMPT};
use super::context::ProviderKind;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Build the provider selected by `kind` from `settings`
pub fn create_provider(kind: ProviderKind, settings: &AssistSettings) -> Result<Arc<dyn CompletionProvider>, AssistError> {
    match kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(&settings.openai)?)),
        ProviderKind::Anthropic => Ok(Arc::new(AnthropicProvider::new(&settings.anthropic)?)),
    }
}

/// OpenAI chat completions
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    settings: ProviderSettings,
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, AssistError> {
        let api_key = settings.resolve_api_key()?;
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
        })
    }

    fn build_request_body(&self, request: &AssistRequest) -> Value {
        json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": request.prompt() }
            ],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn submit(&self, request: &AssistRequest, timeout: Duration) -> Result<String, AssistError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(request))
            .timeout(timeout)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AssistError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OpenAiResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssistError::InvalidResponse("No choices in response".to_string()))
    }
}

/// Anthropic messages API
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    settings: ProviderSettings,
}

impl AnthropicProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, AssistError> {
        let api_key = settings.resolve_api_key()?;
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.anthropic.com".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
        })
    }

    fn build_request_body(&self, request: &AssistRequest) -> Value {
        json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": request.prompt() }
            ],
        })
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn submit(&self, request: &AssistRequest, timeout: Duration) -> Result<String, AssistError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(request))
            .timeout(timeout)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AssistError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnthropicResponse = response.json()?;
        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| AssistError::InvalidResponse("No text content in response".to_string()))
    }
}
