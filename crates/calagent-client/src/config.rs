//! Client configuration.
//!
//! All settings live in one `config.toml`, by default
//! `~/.config/calagent/config.toml`. Every section and key is optional:
//!
//! ```toml
//! [google]
//! credentials_file = "~/.config/calagent/credentials.json"
//! token_path = "~/.local/share/calagent/token.json"
//! timeout_secs = 30
//!
//! [server]
//! transport = "stdio"
//! host = "127.0.0.1"
//! port = 8000
//! path = "/mcp"
//!
//! [llm]
//! model = "gemini-2.5-flash-lite"
//! api_key = "env::GEMINI_API_KEY"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use calagent_providers::google::GoogleConfig;
use calagent_server::{ServerConfig, Transport};

use crate::llm::gemini::DEFAULT_MODEL;

/// Environment variable consulted when `[llm] api_key` is unset.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the calagent client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub google: GoogleSettings,
    pub server: ServerSettings,
    pub llm: LlmSettings,
}

impl ClientConfig {
    /// Loads the default file, or defaults when it does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads a specific file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calagent")
            .join("config.toml")
    }
}

/// `[google]`: OAuth client registration and token cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Client-secret JSON from Google Cloud Console.
    pub credentials_file: Option<PathBuf>,

    pub token_path: Option<PathBuf>,

    /// HTTP timeout for Google APIs.
    pub timeout_secs: Option<u64>,
}

impl GoogleSettings {
    pub fn to_provider_config(&self) -> GoogleConfig {
        let mut config = GoogleConfig::new();

        if let Some(ref path) = self.credentials_file {
            config = config.with_credentials_file(expand_home(path));
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(expand_home(path));
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config
    }
}

/// `[server]`: MCP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            transport: defaults.transport,
            host: defaults.host,
            port: defaults.port,
            path: defaults.path,
        }
    }
}

impl ServerSettings {
    /// Builds the server configuration, letting CLI flags win.
    pub fn to_server_config(
        &self,
        transport: Option<Transport>,
        host: Option<String>,
        port: Option<u16>,
    ) -> ServerConfig {
        ServerConfig::new(transport.unwrap_or(self.transport))
            .with_host(host.unwrap_or_else(|| self.host.clone()))
            .with_port(port.unwrap_or(self.port))
            .with_path(self.path.clone())
    }
}

/// `[llm]`: Gemini settings for `calagent ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,

    /// API key; supports `env::` and `pass::` references.
    pub api_key: Option<String>,

    /// Overrides the Gemini API endpoint.
    pub base_url: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
        }
    }
}

impl LlmSettings {
    /// Resolves the API key from the config, falling back to
    /// `$GEMINI_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String, String> {
        match self.api_key.as_deref() {
            Some(raw) => crate::secret::resolve(raw)
                .map_err(|e| format!("failed to resolve [llm] api_key: {}", e)),
            None => std::env::var(API_KEY_ENV).map_err(|_| {
                format!(
                    "no Gemini API key: set {} (a .env file works) or [llm] api_key in {}",
                    API_KEY_ENV,
                    ClientConfig::default_path().display()
                )
            }),
        }
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
