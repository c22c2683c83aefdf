//! `calagent check` and `calagent free`: run a tool and print its result.

use std::sync::Arc;

use calagent_providers::google::{AuthMode, CredentialStore};
use calagent_server::CalendarTools;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Builds the tools over an interactive credential store.
pub fn interactive_tools(config: &ClientConfig) -> ClientResult<CalendarTools> {
    let google = config.google.to_provider_config();
    let store = CredentialStore::from_config(&google, AuthMode::Interactive)?;
    Ok(CalendarTools::new(Arc::new(store)))
}

pub async fn check(config: &ClientConfig, start: &str, end: &str) -> ClientResult<()> {
    let tools = interactive_tools(config)?;
    println!("{}", tools.check_availability(start, end).await);
    Ok(())
}

pub async fn free(config: &ClientConfig, date: &str) -> ClientResult<()> {
    let tools = interactive_tools(config)?;
    println!("{}", tools.get_free_time(date).await);
    Ok(())
}
