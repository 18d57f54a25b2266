//! Command-line front end: load an ELF64/x86-64 relocatable object, invoke
//! a named function with packed arguments, and print its string result.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bofloader::args::{Arg, ArgBuffer};
use bofloader::driver::{self, DynamicResolver};
use bofloader::error::Error;

/// Load an object file and invoke one of its functions.
#[derive(Parser, Debug)]
#[command(name = "bofloader", about = "In-process ELF64/x86-64 object loader")]
struct Cli {
    /// Path to the ELF64/x86-64 ET_REL object file.
    object_file: String,

    /// Name of the exported function to invoke.
    function_name: String,

    /// Arguments to pack and pass to the function, as `kind:value`
    /// (`int:7`, `short:42`, `str:hello`, `bin:deadbeef`).
    args: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let object_bytes = match fs::read(&cli.object_file) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("could not read '{}': {err}", cli.object_file);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &object_bytes) {
        Ok(result) => {
            println!("Result: {result}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, object_bytes: &[u8]) -> Result<String, Error> {
    let parsed_args: Vec<Arg> = cli
        .args
        .iter()
        .map(|token| Arg::parse_cli_token(token))
        .collect::<Result<_, _>>()?;
    let packed = ArgBuffer::pack(&parsed_args);

    tracing::info!(object = %cli.object_file, function = %cli.function_name, "invoking");
    driver::run(object_bytes, &cli.function_name, packed.as_bytes(), &DynamicResolver)
}
