//! MCP server for calagent.
//!
//! This crate provides:
//! - [`CalendarTools`]: the `check_availability` and `get_free_time` tools
//! - [`McpHandler`]: JSON-RPC dispatch for the MCP methods
//! - stdio and HTTP transports
//! - Unix signal handling for graceful shutdown
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use calagent_providers::google::{AuthMode, CredentialStore, GoogleConfig};
//! use calagent_server::{CalendarTools, McpHandler, SignalHandler, serve_stdio};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CredentialStore::from_config(&GoogleConfig::new(), AuthMode::NonInteractive)?;
//!     let handler = Arc::new(McpHandler::new(CalendarTools::new(Arc::new(store))));
//!
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     serve_stdio(handler, tokio::io::stdin(), tokio::io::stdout(), signals.shutdown()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod http;
mod service;
mod signals;
mod stdio;

pub use config::{ServerConfig, Transport};
pub use error::{ServerError, ServerResult, ToolError};
pub use handler::{McpHandler, SUMMARY_RESOURCE_URI, tool_definitions};
pub use http::{router, serve_http};
pub use service::{CalendarTools, PRIMARY_CALENDAR};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use stdio::serve_stdio;

#[cfg(test)]
mod testing;
