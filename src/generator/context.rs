// src/generator/context.rs

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::parser::Definitions;

/// Default bound on object/array nesting
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// External completion service used by assisted generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(format!("Unsupported AI provider: {}. Use 'openai' or 'anthropic'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    /// Structural rules only, reproducible
    Deterministic,
    /// Ask a completion provider first, fall back to structural rules
    Assisted(ProviderKind),
}

impl GenerationMode {
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            GenerationMode::Deterministic => None,
            GenerationMode::Assisted(kind) => Some(*kind),
        }
    }
}

impl Default for GenerationMode {
    fn default() -> Self {
        GenerationMode::Deterministic
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("deterministic") {
            return Ok(GenerationMode::Deterministic);
        }
        s.parse().map(GenerationMode::Assisted)
    }
}

/// Per-call generation settings
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub mode: GenerationMode,

    /// Free-text description of what the endpoint is for
    pub hint: Option<String>,

    /// "METHOD /path" of the endpoint being generated for, if any
    pub endpoint: Option<String>,

    /// Deepest object/array nesting level allowed (the root container is level 1)
    pub max_depth: usize,

    /// Fail on unsupported schema kinds instead of emitting `null`
    pub strict: bool,

    /// Named schemas that `$ref` nodes resolve against
    pub definitions: Arc<Definitions>,
}

impl Default for GenerationContext {
    fn default() -> Self {
        GenerationContext {
            mode: GenerationMode::Deterministic,
            hint: None,
            endpoint: None,
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
            definitions: Arc::new(Definitions::new()),
        }
    }
}

impl GenerationContext {
    pub fn deterministic() -> Self {
        GenerationContext::default()
    }

    pub fn assisted(provider: ProviderKind) -> Self {
        GenerationContext {
            mode: GenerationMode::Assisted(provider),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_definitions(mut self, definitions: Arc<Definitions>) -> Self {
        self.definitions = definitions;
        self
    }
}
