//! OAuth 2.0 authorization code flow with PKCE for an installed app.
//!
//! The browser is sent to Google's consent page with a loopback redirect
//! URI. A one-shot listener on `127.0.0.1` receives the redirect, and the
//! code is exchanged (together with the PKCE verifier) for tokens.
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind the loopback listener
//! 3. Open the consent URL in the browser (or print it)
//! 4. Wait for `GET /callback?code=..&state=..`
//! 5. Exchange the code at the token endpoint

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

/// Verifier entropy in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PATH: &str = "/callback";

/// Issues and refreshes OAuth tokens.
///
/// The credential store only talks to the network through this trait.
pub trait TokenAuthority: Send + Sync {
    /// Runs the interactive consent flow.
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<TokenInfo>>;

    /// Trades a refresh token for a new access token.
    fn refresh<'a>(&'a self, refresh_token: &'a str)
    -> BoxFuture<'a, ProviderResult<RefreshedToken>>;
}

/// The useful part of a refresh response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    /// Present only when Google rotates the refresh token.
    pub refresh_token: Option<String>,
}

/// Talks to Google's OAuth endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    auth_url: String,
    token_url: String,
    port_range: (u16, u16),
    callback_timeout: Duration,
}

impl OAuthClient {
    pub fn new(
        credentials: OAuthCredentials,
        config: &GoogleConfig,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            http_client,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            port_range: config.loopback_port_range,
            callback_timeout: CALLBACK_TIMEOUT,
        }
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    async fn run_consent_flow(&self, scopes: &[String]) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback(self.port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);
        let auth_url =
            pkce.build_auth_url(&self.auth_url, &self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow on port {}", port);
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = wait_for_callback(listener, self.callback_timeout).await?;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch in callback",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.post_token_request(&params, "token exchange").await?;

        info!("obtained OAuth tokens");
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_request(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
        })
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        context: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(context, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(context, e))?;

        if !status.is_success() {
            // The token endpoint answers 400 invalid_grant for revoked or
            // expired refresh tokens.
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                context,
                status,
                body.trim()
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid {} response: {}", context, e))
        })
    }
}

impl TokenAuthority for OAuthClient {
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(self.run_consent_flow(scopes))
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
        Box::pin(self.refresh_access_token(refresh_token))
    }
}

/// Binds the first free port of `port_range` on the loopback interface.
///
/// Returns the listener and the port actually bound, which differs from
/// the requested one when the range is `(0, 0)`.
async fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await else {
            continue;
        };
        let bound = listener
            .local_addr()
            .map_err(|e| ProviderError::internal("failed to read listener address").with_source(e))?
            .port();
        debug!("bound loopback listener on port {}", bound);
        return Ok((listener, bound));
    }

    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Code and state delivered to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AuthorizationCallback {
    code: String,
    state: String,
}

async fn wait_for_callback(
    listener: TcpListener,
    timeout: Duration,
) -> ProviderResult<AuthorizationCallback> {
    let accept_loop = async {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    return Err(ProviderError::internal("failed to accept callback connection")
                        .with_source(e));
                }
            };
            debug!("callback connection from {}", peer);
            if let Some(result) = handle_callback(stream).await {
                return result;
            }
        }
    };

    tokio::time::timeout(timeout, accept_loop)
        .await
        .map_err(|_| ProviderError::authentication("timed out waiting for OAuth callback"))?
}

/// Answers one HTTP request on the loopback listener.
///
/// Returns `None` for requests that are not the redirect (favicon probes
/// and the like) so the caller keeps listening.
async fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<AuthorizationCallback>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        reader.read_line(&mut request_line).await.ok()?;

        // Drain the headers so closing the socket does not reset it.
        let mut header = String::new();
        loop {
            header.clear();
            match reader.read_line(&mut header).await {
                Ok(0) | Err(_) => break,
                Ok(_) if header.trim().is_empty() => break,
                Ok(_) => {}
            }
        }
    }

    let outcome = match parse_callback(&request_line) {
        Some(outcome) => outcome,
        None => {
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
                .await;
            return None;
        }
    };

    let page: &[u8] = if outcome.is_ok() {
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
          <html><body><h1>calagent is authorized</h1>\
          <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
          <html><body><h1>Authorization failed</h1>\
          <p>You can close this window.</p></body></html>"
    };
    let _ = stream.write_all(page).await;
    let _ = stream.flush().await;

    Some(outcome)
}

/// Interprets the request line of a redirect, e.g.
/// `GET /callback?code=abc&state=xyz HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<ProviderResult<AuthorizationCallback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authorization(format!(
            "authorization denied: {}",
            error
        ))));
    }

    Some(match code {
        Some(code) => Ok(AuthorizationCallback {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE parameters for one authorization attempt (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// base64url(SHA-256(verifier))
    pub challenge: String,
    /// Echoed back by Google; checked against the callback.
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent URL. `access_type=offline` and `prompt=consent`
    /// make Google return a refresh token every time.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_endpoint,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
