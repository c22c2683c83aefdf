//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Provider error.
    Provider(String),
    /// No usable credential.
    Auth(String),
    /// The MCP server failed to start or stopped on an error.
    Server(String),
    /// The LLM API failed or answered unexpectedly.
    Llm(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Auth(msg) => write!(f, "authentication error: {}", msg),
            Self::Server(msg) => write!(f, "server error: {}", msg),
            Self::Llm(msg) => write!(f, "LLM error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<calagent_providers::ProviderError> for ClientError {
    fn from(err: calagent_providers::ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<calagent_providers::AuthError> for ClientError {
    fn from(err: calagent_providers::AuthError) -> Self {
        Self::Auth(err.to_string())
    }
}

impl From<calagent_server::ServerError> for ClientError {
    fn from(err: calagent_server::ServerError) -> Self {
        match err {
            calagent_server::ServerError::Auth(e) => e.into(),
            other => Self::Server(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Llm(err.to_string())
    }
}
