//! `calagent serve`: the MCP server in the foreground.

use std::sync::Arc;

use tracing::info;

use calagent_providers::ClientSource;
use calagent_providers::google::{AuthMode, CredentialStore};
use calagent_server::{
    CalendarTools, McpHandler, ServerError, SignalHandler, Transport, serve_http, serve_stdio,
};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Serves until EOF (stdio) or SIGINT/SIGTERM.
///
/// A usable credential must be obtainable without a browser before any
/// transport starts.
pub async fn run(
    config: &ClientConfig,
    transport: Option<Transport>,
    host: Option<String>,
    port: Option<u16>,
) -> ClientResult<()> {
    let server_config = config.server.to_server_config(transport, host, port);

    let google = config.google.to_provider_config();
    let store = CredentialStore::from_config(&google, AuthMode::NonInteractive)?;
    store
        .obtain_client()
        .await
        .map_err(ServerError::from)?;
    info!("Google credential is valid");

    let source: Arc<dyn ClientSource> = Arc::new(store);
    let handler = Arc::new(McpHandler::new(CalendarTools::new(source)));

    let signals = SignalHandler::new();
    signals.spawn_listener();

    info!(transport = %server_config.transport, "Starting MCP server");
    match server_config.transport {
        Transport::Stdio => {
            serve_stdio(
                handler,
                tokio::io::stdin(),
                tokio::io::stdout(),
                signals.shutdown(),
            )
            .await?
        }
        Transport::Http => serve_http(handler, &server_config, signals.shutdown()).await?,
    }

    info!("MCP server stopped");
    Ok(())
}
