// This is the entry point for the CLI application.
// It parses command-line arguments, generates test data for one endpoint and
// prints it or writes it to a file.

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use openapi_test_data::cli::Args;
use openapi_test_data::generator::AssistSettings;
use openapi_test_data::utils::{test_data_file_name, write_to_file};
use openapi_test_data::{generate_test_data_from_spec, GenerationContext};

fn main() {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("Error generating test data: {}", err);
        process::exit(1);
    }
}

fn run(args: &Args) -> openapi_test_data::Result<()> {
    let mut ctx = GenerationContext::default()
        .with_mode(args.mode.into())
        .with_max_depth(args.max_depth)
        .with_strict(args.strict);
    if let Some(hint) = &args.hint {
        ctx = ctx.with_hint(hint.clone());
    }

    let data = generate_test_data_from_spec(&args.spec, &args.path, &args.method, &ctx, AssistSettings::default())?;
    let json = data.to_json_pretty()?;

    match &args.output {
        Some(output) => {
            let target = if output.is_dir() {
                output.join(test_data_file_name(&data.method, &data.path))
            } else {
                output.clone()
            };
            write_to_file(&target, format!("{}\n", json))?;
            println!("Test data written to {}", target.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
