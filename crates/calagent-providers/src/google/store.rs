//! Credential store: turns the persisted token record into an
//! authenticated [`GoogleCalendarClient`].
//!
//! Each call to [`CredentialStore::obtain_client`]:
//!
//! 1. reuses the in-memory record if it is still valid
//! 2. otherwise loads the token file (missing or malformed counts as absent)
//! 3. refreshes an expired record that has a refresh token, then persists it
//! 4. runs the browser flow when nothing usable exists, if allowed
//!
//! The whole sequence runs under one async mutex so concurrent requests
//! never refresh twice or race on the token file.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AuthError, ProviderResult};
use crate::provider::{BoxFuture, CalendarApi, ClientSource};

use super::client::GoogleCalendarClient;
use super::config::{GoogleConfig, OAuthCredentials};
use super::oauth::{OAuthClient, TokenAuthority};
use super::tokens::{TokenInfo, TokenStorage};

/// Whether the store may open a browser to obtain consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Missing credentials trigger the browser flow.
    Interactive,
    /// Missing credentials fail with [`AuthError::AuthorizationRequired`].
    NonInteractive,
}

pub struct CredentialStore<A = OAuthClient> {
    storage: TokenStorage,
    authority: A,
    http_client: reqwest::Client,
    api_base_url: String,
    scopes: Vec<String>,
    mode: AuthMode,
    current: Mutex<Option<TokenInfo>>,
}

impl CredentialStore<OAuthClient> {
    /// Builds a store talking to Google, reading the OAuth registration
    /// from `config.credentials_file`.
    pub fn from_config(config: &GoogleConfig, mode: AuthMode) -> ProviderResult<Self> {
        config.validate()?;
        let credentials = OAuthCredentials::from_file(&config.credentials_file)?;
        credentials.validate()?;

        let http_client = config.http_client()?;
        let authority = OAuthClient::new(credentials, config, http_client.clone());
        Ok(Self::new(config, authority, http_client, mode))
    }
}

impl<A: TokenAuthority> CredentialStore<A> {
    pub fn new(
        config: &GoogleConfig,
        authority: A,
        http_client: reqwest::Client,
        mode: AuthMode,
    ) -> Self {
        Self {
            storage: TokenStorage::new(&config.token_path),
            authority,
            http_client,
            api_base_url: config.api_base_url.clone(),
            scopes: config.scopes.clone(),
            mode,
            current: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Returns a client bound to a currently valid access token.
    pub async fn obtain_client(&self) -> Result<GoogleCalendarClient, AuthError> {
        let mut current = self.current.lock().await;

        if let Some(tokens) = current.as_ref().filter(|t| !t.is_expired()) {
            return Ok(self.client_for(tokens));
        }

        let stored = match current.take() {
            Some(tokens) => Some(tokens),
            None => self.storage.load(),
        };

        let tokens = match stored {
            Some(tokens) if !tokens.is_expired() => {
                debug!("using stored access token");
                tokens
            }
            Some(tokens) if tokens.can_refresh() => self.refresh(tokens).await?,
            Some(_) => {
                info!("stored access token expired and has no refresh token");
                self.authorize_if_allowed().await?
            }
            None => self.authorize_if_allowed().await?,
        };

        let client = self.client_for(&tokens);
        *current = Some(tokens);
        Ok(client)
    }

    /// Makes sure a usable credential is persisted, running the browser
    /// flow when needed. With `force`, the flow always runs.
    ///
    /// Interactive regardless of [`AuthMode`]: this backs explicit
    /// provisioning.
    pub async fn authorize(&self, force: bool) -> Result<TokenInfo, AuthError> {
        let mut current = self.current.lock().await;

        if !force {
            match current.take().or_else(|| self.storage.load()) {
                Some(tokens) if !tokens.is_expired() => {
                    *current = Some(tokens.clone());
                    return Ok(tokens);
                }
                Some(tokens) if tokens.can_refresh() => match self.refresh(tokens).await {
                    Ok(tokens) => {
                        *current = Some(tokens.clone());
                        return Ok(tokens);
                    }
                    Err(e) => warn!("{}; starting a new authorization", e),
                },
                _ => {}
            }
        }

        let tokens = self.run_authorization().await?;
        *current = Some(tokens.clone());
        Ok(tokens)
    }

    async fn refresh(&self, mut tokens: TokenInfo) -> Result<TokenInfo, AuthError> {
        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return Err(AuthError::AuthorizationRequired);
        };

        debug!("refreshing expired access token");
        let refreshed = self
            .authority
            .refresh(&refresh_token)
            .await
            .map_err(AuthError::RefreshFailed)?;

        tokens.apply_refresh(
            refreshed.access_token,
            refreshed.expires_in,
            refreshed.refresh_token,
        );
        self.storage.save(&tokens).map_err(AuthError::Storage)?;
        Ok(tokens)
    }

    async fn authorize_if_allowed(&self) -> Result<TokenInfo, AuthError> {
        match self.mode {
            AuthMode::Interactive => self.run_authorization().await,
            AuthMode::NonInteractive => Err(AuthError::AuthorizationRequired),
        }
    }

    async fn run_authorization(&self) -> Result<TokenInfo, AuthError> {
        let tokens = self
            .authority
            .authorize(&self.scopes)
            .await
            .map_err(AuthError::Authorization)?;
        self.storage.save(&tokens).map_err(AuthError::Storage)?;
        info!("saved new credential to {:?}", self.storage.path());
        Ok(tokens)
    }

    fn client_for(&self, tokens: &TokenInfo) -> GoogleCalendarClient {
        GoogleCalendarClient::new(
            self.http_client.clone(),
            tokens.access_token.clone(),
            self.api_base_url.clone(),
        )
    }
}

impl<A: TokenAuthority> ClientSource for CredentialStore<A> {
    fn obtain_client(&self) -> BoxFuture<'_, Result<Box<dyn CalendarApi>, AuthError>> {
        Box::pin(async move {
            let client = CredentialStore::obtain_client(self).await?;
            Ok(Box::new(client) as Box<dyn CalendarApi>)
        })
    }
}
