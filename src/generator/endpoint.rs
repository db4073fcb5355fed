// src/generator/endpoint.rs

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::assisted::{AssistError, AssistSettings, CompletionProvider};
use super::context::{GenerationContext, GenerationMode, ProviderKind};
use super::data::{Generator, Result};
use super::providers::create_provider;
use crate::parser::{Endpoint, Parameter, ParameterLocation, SpecIndex};

/// Builds the completion provider for a provider kind
pub type ProviderFactory =
    Arc<dyn Fn(ProviderKind) -> std::result::Result<Arc<dyn CompletionProvider>, AssistError> + Send + Sync>;

/// Generated inputs for one endpoint.
///
/// Maps are ordered by name so the serialized form is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointTestData {
    pub method: String,

    pub path: String,

    #[serde(default)]
    pub path_params: BTreeMap<String, Value>,

    #[serde(default)]
    pub query_params: BTreeMap<String, Value>,

    #[serde(default)]
    pub headers: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Example of the success response the endpoint should return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl EndpointTestData {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Generates [`EndpointTestData`] for the endpoints of a loaded specification.
///
/// The generator built for the last requested mode is kept and reused until a
/// call asks for a different mode, at which point it is replaced.
pub struct TestDataGenerator {
    index: Arc<SpecIndex>,
    settings: AssistSettings,
    factory: ProviderFactory,
    cached: Mutex<Option<(GenerationMode, Arc<Generator>)>>,
}

impl TestDataGenerator {
    pub fn new(index: Arc<SpecIndex>, settings: AssistSettings) -> Self {
        let factory_settings = settings.clone();
        TestDataGenerator {
            index,
            settings,
            factory: Arc::new(move |kind: ProviderKind| create_provider(kind, &factory_settings)),
            cached: Mutex::new(None),
        }
    }

    /// Replace how completion providers are built
    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.factory = factory;
        *self.cached.get_mut() = None;
        self
    }

    pub fn index(&self) -> &Arc<SpecIndex> {
        &self.index
    }

    /// The generator for `mode`, reusing the cached one when the mode is unchanged.
    ///
    /// A deterministic stand-in for a provider that could not be built is not
    /// cached, so the next call tries the provider again.
    pub fn generator_for(&self, mode: GenerationMode) -> Arc<Generator> {
        let mut cached = self.cached.lock();
        if let Some((cached_mode, generator)) = cached.as_ref() {
            if *cached_mode == mode {
                return Arc::clone(generator);
            }
        }

        match self.build_generator(mode) {
            Some(generator) => {
                let generator = Arc::new(generator);
                *cached = Some((mode, Arc::clone(&generator)));
                generator
            }
            None => {
                *cached = None;
                Arc::new(Generator::deterministic())
            }
        }
    }

    fn build_generator(&self, mode: GenerationMode) -> Option<Generator> {
        match mode {
            GenerationMode::Deterministic => Some(Generator::deterministic()),
            GenerationMode::Assisted(kind) => match (self.factory)(kind) {
                Ok(provider) => {
                    info!("Using {} for assisted test data generation", provider.name());
                    Some(Generator::assisted(provider, &self.settings))
                }
                Err(e) => {
                    warn!("Cannot create {} provider ({}), generating deterministically", kind, e);
                    None
                }
            },
        }
    }

    /// Generate path, query, header and cookie parameters, body and expected
    /// response for the endpoint at `path` / `method`
    pub fn generate_for_endpoint(&self, path: &str, method: &str, ctx: &GenerationContext) -> Result<EndpointTestData> {
        let endpoint = self.index.lookup(path, method)?;
        let generator = self.generator_for(ctx.mode);

        info!("Generating test data for {} {}", endpoint.method, endpoint.path);

        let mut ctx = ctx.clone().with_definitions(Arc::clone(self.index.definitions()));
        if ctx.endpoint.is_none() {
            ctx.endpoint = Some(format!("{} {}", endpoint.method, endpoint.path));
        }
        if ctx.hint.is_none() {
            ctx.hint = endpoint.summary.clone().or_else(|| endpoint.description.clone());
        }

        let params = |location| generate_params(&generator, endpoint, location, &ctx);

        let body = match &endpoint.request_body {
            Some(body) => Some(generator.generate(&body.schema, &ctx)?),
            None => None,
        };

        let response = match endpoint.success_response().and_then(|r| r.schema.as_ref()) {
            Some(schema) => Some(generator.generate(schema, &ctx)?),
            None => None,
        };

        Ok(EndpointTestData {
            method: endpoint.method.to_string(),
            path: endpoint.path.clone(),
            path_params: params(ParameterLocation::Path)?,
            query_params: params(ParameterLocation::Query)?,
            headers: params(ParameterLocation::Header)?,
            cookies: params(ParameterLocation::Cookie)?,
            body,
            response,
        })
    }
}

fn generate_params(
    generator: &Generator,
    endpoint: &Endpoint,
    location: ParameterLocation,
    ctx: &GenerationContext,
) -> Result<BTreeMap<String, Value>> {
    endpoint
        .parameters_in(location)
        .map(|Parameter { name, schema, .. }| Ok((name.clone(), generator.generate_named(schema, ctx, Some(name.as_str()))?)))
        .collect()
}
