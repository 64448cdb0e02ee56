mod commands;
mod config;
mod coordinator;
mod error;
mod events;
mod extract;
mod identity;
mod messaging;
mod runtime;
mod subprocess;
mod telemetry;
mod transport;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::doctor::DoctorArgs;
use commands::extract::ExtractArgs;
use commands::fetch::FetchArgs;
use commands::init::InitArgs;
use commands::run::RunArgs;

#[derive(Debug, Parser)]
#[command(
    name = "whatsmyip",
    version,
    about = "Reply to \"ip\" chat messages with this host's external IP address"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the agent (botbus by default, stdin/stdout with --console)
    Run(RunArgs),
    /// Fetch the configured page once and print the address
    Fetch(FetchArgs),
    /// Apply the extraction pattern to a file or stdin
    Extract(ExtractArgs),
    /// Write a default .whatsmyip.toml
    Init(InitArgs),
    /// Validate config and companion tools
    Doctor(DoctorArgs),
    /// Print the JSON Schema for .whatsmyip.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Fetch(_) => "fetch",
            Self::Extract(_) => "extract",
            Self::Init(_) => "init",
            Self::Doctor(_) => "doctor",
            Self::Schema => "schema",
        }
    }

    const fn default_log_level(&self) -> &'static str {
        match self {
            Self::Run(_) => "info",
            _ => "warn",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    telemetry::init(cli.command.default_log_level());

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Run(args) => args.execute(),
        Commands::Fetch(args) => args.execute(),
        Commands::Extract(args) => args.execute(),
        Commands::Init(args) => args.execute(),
        Commands::Doctor(args) => args.execute(),
        Commands::Schema => config::json_schema().map(|schema| println!("{schema}")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
