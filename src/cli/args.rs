use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::generator::{GenerationMode, ProviderKind, DEFAULT_MAX_DEPTH};

#[derive(Debug, Parser)]
#[clap(
    name = "openapi-test-data",
    about = "Generate test data for API endpoints from OpenAPI/Swagger specifications",
    version
)]
pub struct Args {
    /// Path to the Swagger/OpenAPI specification file (JSON or YAML)
    #[clap(short, long, value_name = "FILE")]
    pub spec: PathBuf,

    /// Path template of the endpoint, e.g. /users/{id}
    #[clap(short, long, value_name = "PATH")]
    pub path: String,

    /// HTTP method of the endpoint
    #[clap(short, long, value_name = "METHOD", default_value = "GET")]
    pub method: String,

    /// How values are generated
    #[clap(long, value_enum, default_value = "deterministic")]
    pub mode: Mode,

    /// Free-text description of the endpoint, passed to assisted generation
    #[clap(long, value_name = "TEXT")]
    pub hint: Option<String>,

    /// Deepest object/array nesting to generate
    #[clap(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Fail on unsupported schema constructs instead of emitting null
    #[clap(long)]
    pub strict: bool,

    /// Write the test data to this file, or into this directory if it exists
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Structural rules only, reproducible output
    Deterministic,
    /// Ask OpenAI for realistic values, falling back to structural rules
    Openai,
    /// Ask Anthropic for realistic values, falling back to structural rules
    Anthropic,
}

impl From<Mode> for GenerationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Deterministic => GenerationMode::Deterministic,
            Mode::Openai => GenerationMode::Assisted(ProviderKind::OpenAi),
            Mode::Anthropic => GenerationMode::Assisted(ProviderKind::Anthropic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from([
            "openapi-test-data",
            "--spec",
            "api.yaml",
            "--path",
            "/users",
            "-m",
            "post",
            "--mode",
            "anthropic",
            "--max-depth",
            "4",
        ]);
        assert_eq!(args.method, "post");
        assert_eq!(GenerationMode::from(args.mode), GenerationMode::Assisted(ProviderKind::Anthropic));
        assert_eq!(args.max_depth, 4);
        assert!(!args.strict);
        assert!(args.output.is_none());
    }
}
