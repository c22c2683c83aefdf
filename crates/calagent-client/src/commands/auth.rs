//! `calagent auth`: one-time interactive authorization.

use tracing::info;

use calagent_providers::google::{AuthMode, CredentialStore};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Runs the Google OAuth flow and persists the token file.
///
/// Without `force`, a usable stored credential is kept (and refreshed if
/// it has expired).
pub async fn run(config: &ClientConfig, force: bool) -> ClientResult<()> {
    let google = config.google.to_provider_config();
    let store = CredentialStore::from_config(&google, AuthMode::Interactive)?;

    let usable = store
        .storage()
        .load()
        .is_some_and(|t| !t.is_expired() || t.can_refresh());

    if usable && !force {
        store.authorize(false).await?;
        println!("Already authorized with Google Calendar.");
        println!("Use --force to authorize again.");
        return Ok(());
    }

    println!("Starting Google Calendar authorization...");
    println!();
    println!("A browser window will open for you to grant read-only access.");
    println!("If it doesn't, open the URL printed below.");
    println!();

    store.authorize(true).await?;

    info!(path = %store.storage().path().display(), "Google authorization saved");
    println!();
    println!("Authorization successful!");
    println!("Token saved to {}", store.storage().path().display());

    Ok(())
}
