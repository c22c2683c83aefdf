//! Google Calendar provider.
//!
//! - [`config`]: client-secret file and endpoint settings
//! - [`oauth`]: OAuth 2.0 authorization code flow with PKCE over a
//!   loopback redirect
//! - [`tokens`]: the persisted token record
//! - [`store`]: the [`CredentialStore`] handing out authenticated clients
//! - [`client`]: Calendar API v3 calls

pub mod client;
pub mod config;
pub mod oauth;
pub mod store;
pub mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken, TokenAuthority};
pub use store::{AuthMode, CredentialStore};
pub use tokens::{TokenInfo, TokenStorage};
