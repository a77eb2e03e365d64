//! dynakit command line: executes record actions and scaffolds action projects.

#![forbid(unsafe_code)]

mod cli_config;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dynakit_scaffold::DEFAULT_SERVICE_URL;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dynakit", version, about = "Record action runner and project scaffolder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute the configured action against the organization service.
    Run {
        /// JSON action payload file, or '-' to read standard input.
        #[arg(long, default_value = "-")]
        input: String,
    },

    /// Scaffold a new action project directory.
    New {
        /// Action name, also the default project directory.
        action_name: String,

        /// Company or publisher name recorded in the generated files.
        #[arg(long)]
        company: String,

        /// Logical name of the record type the action updates.
        #[arg(long = "entity")]
        entity_logical_name: String,

        /// Organization service root written into the generated `.env`.
        #[arg(long, default_value = DEFAULT_SERVICE_URL)]
        service_url: String,

        /// Output directory; defaults to the action name.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Overwrite files that already exist.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { input } => commands::run(input.as_str()).await,
        Command::New {
            action_name,
            company,
            entity_logical_name,
            service_url,
            dir,
            force,
        } => commands::new_project(commands::NewProjectArgs {
            action_name,
            company,
            entity_logical_name,
            service_url,
            dir,
            force,
        }),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(error) => {
            error!(error = %error, "dynakit command failed");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
