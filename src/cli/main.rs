//! domain-schema-docs command line interface

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use domain_schema_docs::cli::CliError;
use domain_schema_docs::cli::commands::build::{BuildArgs, handle_build};
use domain_schema_docs::cli::commands::check::{CheckArgs, handle_check};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "domain-schema-docs",
    version,
    about = "Resolve domain schemas and generate their documentation"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the input, run plugins and write the documentation
    Build(BuildArgs),
    /// Read and validate the input without writing anything
    Check(CheckArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    runtime.block_on(async {
        match &cli.command {
            Commands::Build(args) => handle_build(args).await.map(|_| ()),
            Commands::Check(args) => handle_check(args).await.map(|_| ()),
        }
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
