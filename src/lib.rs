pub mod cli;
pub mod parser;
pub mod generator;
pub mod keywords;
pub mod utils;

// Re-export frequently used items for easier access
pub use parser::{SchemaNode, SpecIndex};
pub use generator::{
    EndpointTestData,
    GenerationContext,
    GenerationMode,
    Generator,
    ProviderKind,
    TestDataGenerator,
};
pub use keywords::ApiTestingLibrary;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Parser error: {0}")]
    ParserError(#[from] parser::SpecError),

    #[error("Generator error: {0}")]
    GeneratorError(#[from] generator::GenerationError),

    #[error("Keyword error: {0}")]
    KeywordError(#[from] keywords::KeywordError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Generate test data for one endpoint of a Swagger/OpenAPI specification file
pub fn generate_test_data_from_spec<P: AsRef<Path>>(
    spec_file: P,
    endpoint_path: &str,
    method: &str,
    ctx: &GenerationContext,
    settings: generator::AssistSettings,
) -> Result<EndpointTestData> {
    // Parse the Swagger/OpenAPI specification
    let index = SpecIndex::from_file(spec_file)?;

    let generator = TestDataGenerator::new(Arc::new(index), settings);

    Ok(generator.generate_for_endpoint(endpoint_path, method, ctx)?)
}
