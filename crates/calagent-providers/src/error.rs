//! Error types for calendar and OAuth operations.
//!
//! [`ProviderError`] covers a single failed call against Google (token
//! endpoint or Calendar API). [`AuthError`] is what the credential store
//! reports when it cannot hand out an authenticated client.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials are invalid or expired (401).
    AuthenticationFailed,
    /// The user lacks permission (403).
    AuthorizationFailed,
    /// Connection failed, timed out, DNS resolution, etc.
    NetworkError,
    /// Too many requests (429).
    RateLimited,
    /// Any other non-success status.
    ServerError,
    /// The response body could not be parsed.
    InvalidResponse,
    NotFound,
    BadRequest,
    /// Missing or invalid local configuration, e.g. the client-secret file.
    ConfigurationError,
    /// Reading or writing the token file failed.
    StorageError,
    InternalError,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::StorageError => "storage_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to a calendar provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The provider that generated this error (e.g. "google").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::StorageError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Classifies a non-success HTTP status.
    ///
    /// `context` names the call that failed; `body` is the response body,
    /// which Google fills with a JSON error object.
    pub fn from_status(status: StatusCode, context: &str, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("{} ({})", context, status)
        } else {
            format!("{} ({}): {}", context, status, body.trim())
        };

        match status {
            StatusCode::UNAUTHORIZED => Self::authentication(message),
            StatusCode::FORBIDDEN => Self::authorization(message),
            StatusCode::NOT_FOUND => Self::not_found(message),
            StatusCode::BAD_REQUEST => Self::bad_request(message),
            StatusCode::TOO_MANY_REQUESTS => Self::rate_limited(message),
            _ => Self::server(message),
        }
    }

    /// Wraps a transport-level failure (no HTTP status was received).
    pub fn from_transport(context: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("{}: request timed out", context)
        } else if err.is_connect() {
            format!("{}: connection failed", context)
        } else {
            format!("{}: request failed", context)
        };
        Self::network(message).with_source(err)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Why the credential store could not produce an authenticated client.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credential exists and interactive authorization is not
    /// allowed in this context.
    #[error("no valid Google credential found; run `calagent auth` to authorize")]
    AuthorizationRequired,

    /// The stored refresh token was rejected or the token endpoint failed.
    #[error("failed to refresh access token: {0}")]
    RefreshFailed(#[source] ProviderError),

    /// The interactive browser flow failed.
    #[error("authorization failed: {0}")]
    Authorization(#[source] ProviderError),

    /// The token file could not be written.
    #[error("credential storage error: {0}")]
    Storage(#[source] ProviderError),
}
