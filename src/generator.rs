// Schema-driven test data generation: the deterministic core, the assisted
// layer on top of it and the per-endpoint facade.

pub mod assisted;
pub mod context;
pub mod data;
pub mod endpoint;
pub mod providers;
pub mod validate;

pub use assisted::{AssistError, AssistRequest, AssistSettings, CompletionProvider, ProviderSettings};
pub use context::{GenerationContext, GenerationMode, ProviderKind, DEFAULT_MAX_DEPTH};
pub use data::{GenerationError, Generator, Result};
pub use endpoint::{EndpointTestData, ProviderFactory, TestDataGenerator};
pub use providers::{create_provider, AnthropicProvider, OpenAiProvider};
pub use validate::validate;
