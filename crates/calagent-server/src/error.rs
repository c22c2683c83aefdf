//! Server error types.

use std::io;
use thiserror::Error;

use calagent_core::TimeError;
use calagent_providers::{AuthError, ProviderError};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop a transport.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] calagent_protocol::ProtocolError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// No usable credential at startup.
    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}

/// Failure inside a tool call.
///
/// Never crosses the transport: tools render it into their text result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Time(#[from] TimeError),

    #[error("end time {end} is before start time {start}")]
    InvalidWindow { start: String, end: String },

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Provider(#[from] ProviderError),
}
