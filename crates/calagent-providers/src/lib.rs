//! Calendar access for calagent.
//!
//! - [`CalendarApi`]: read-only calendar operations used by the tools
//! - [`ClientSource`]: hands out authenticated clients
//! - [`google`]: OAuth 2.0 PKCE, token persistence, the [`google::CredentialStore`]
//!   and the Calendar API v3 client
//!
//! ```text
//! ┌──────────────────┐  obtain_client  ┌───────────────────────┐
//! │ CredentialStore  │ ──────────────► │ GoogleCalendarClient  │
//! │  TokenStorage    │                 │  (impl CalendarApi)   │
//! │  TokenAuthority  │                 └───────────┬───────────┘
//! └──────────────────┘                             │
//!                                                  ▼
//!                                    www.googleapis.com/calendar/v3
//! ```

pub mod error;
pub mod google;
pub mod provider;

pub use error::{AuthError, ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, CalendarApi, ClientSource};
