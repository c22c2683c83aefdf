//! calagent CLI entry point.

use clap::Parser;

use calagent_client::cli::{Cli, Command};
use calagent_client::commands;
use calagent_client::config::ClientConfig;
use calagent_client::error::{ClientError, ClientResult};
use calagent_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // GEMINI_API_KEY may come from ./.env
    let _ = dotenvy::dotenv();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else if matches!(cli.command, Command::Serve { .. }) {
        TracingConfig::mcp_server()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    };

    // The blocking stdin reader used by the stdio transport would keep the
    // runtime from shutting down.
    std::process::exit(code);
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    match cli.command {
        Command::Auth { force } => commands::auth::run(&config, force).await,
        Command::Serve {
            transport,
            host,
            port,
        } => commands::serve::run(&config, transport, host, port).await,
        Command::Ask { query, model } => commands::ask::run(&config, query, model).await,
        Command::Check { start, end } => commands::tools::check(&config, &start, &end).await,
        Command::Free { date } => commands::tools::free(&config, &date).await,
    }
}
