pub mod client;
pub mod commands;
pub mod config;
pub mod errors;
pub mod protocol;
pub mod server;
pub mod store;

use clap::Parser;

use crate::commands::{Cli, Command};
use crate::errors::IntakeResult;

/// Entry point shared by the `intake` binary.
pub async fn run() -> IntakeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // A missing or broken config is not fatal: run on defaults.
    let config = config::load_or_fallback(cli.config.as_deref());

    match cli.command.unwrap_or(Command::Serve {
        port: None,
        bind: None,
    }) {
        Command::Serve { port, bind } => commands::serve(config, port, bind).await,
        Command::Scan { server } => commands::scan(config, server).await,
        Command::InitConfig { path, force } => commands::init_config(&config, &path, force),
    }
}
