//! OAuth token record and its on-disk storage.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// Seconds subtracted from `expires_in` so a token is refreshed before
/// Google actually rejects it.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A persisted OAuth credential.
///
/// Also reads token files written by Google's Python client library,
/// which name the access token `token` and the expiry `expiry` and carry
/// extra fields that are ignored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(alias = "token")]
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default, alias = "expiry")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default = "Utc::now")]
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// A record without an expiry is treated as valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Applies a refresh response.
    ///
    /// Google usually omits the refresh token on refresh; the existing one
    /// is kept in that case.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// File-backed token storage.
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so a reader never sees a half-written record.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the stored record.
    ///
    /// A missing file, unreadable file, or malformed record all yield
    /// `None`: the caller re-authorizes in each case.
    pub fn load(&self) -> Option<TokenInfo> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token file at {:?}", self.path);
                return None;
            }
            Err(e) => {
                warn!("failed to read token file {:?}: {}", self.path, e);
                return None;
            }
        };

        match serde_json::from_str::<TokenInfo>(&content) {
            Ok(tokens) => {
                debug!("loaded token record from {:?}", self.path);
                Some(tokens)
            }
            Err(e) => {
                warn!("ignoring malformed token file {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Replaces the stored record.
    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create {:?}", parent)).with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(tokens).map_err(|e| {
            ProviderError::internal("failed to serialize token record").with_source(e)
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::storage(format!("failed to write {:?}", temp_path)).with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::storage(format!("failed to replace {:?}", self.path)).with_source(e)
        })?;

        debug!("saved token record to {:?}", self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, TokenStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("nested").join("token.json"));
        (dir, storage)
    }

    #[test]
    fn new_token_expires_with_margin() {
        let token = TokenInfo::new("access", Some("refresh".into()), Some(3600), vec![]);
        let remaining = token.expires_at.unwrap() - Utc::now();
        assert!(remaining <= Duration::seconds(3540));
        assert!(remaining > Duration::seconds(3500));
        assert!(!token.is_expired());
        assert!(token.can_refresh());
    }

    #[test]
    fn short_lived_token_is_already_expired() {
        let token = TokenInfo::new("access", None, Some(30), vec![]);
        assert!(token.is_expired());
    }

    #[test]
    fn token_without_expiry_is_valid() {
        let token = TokenInfo::new("access", None, None, vec![]);
        assert!(!token.is_expired());
    }

    #[test]
    fn refresh_keeps_refresh_token_when_omitted() {
        let mut token = TokenInfo::new("old", Some("refresh".into()), Some(0), vec![]);
        token.apply_refresh("new", Some(3600), None);
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert!(!token.is_expired());

        token.apply_refresh("newer", Some(3600), Some("rotated".into()));
        assert_eq!(token.refresh_token.as_deref(), Some("rotated"));
    }

    #[test]
    fn save_and_load() {
        let (_dir, storage) = storage();
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".into()),
            Some(3600),
            vec![GOOGLE_SCOPE.to_string()],
        );

        storage.save(&token).unwrap();
        assert!(storage.path().exists());
        assert!(!storage.path().with_extension("json.tmp").exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded, token);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, storage) = storage();
        storage
            .save(&TokenInfo::new("a", None, None, vec![]))
            .unwrap();
        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_loads_nothing() {
        let (_dir, storage) = storage();
        assert!(storage.load().is_none());
    }

    #[test]
    fn malformed_file_loads_nothing() {
        let (_dir, storage) = storage();
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();

        fs::write(storage.path(), "{ not json").unwrap();
        assert!(storage.load().is_none());

        fs::write(storage.path(), r#"{"refresh_token": "only"}"#).unwrap();
        assert!(storage.load().is_none());
    }

    #[test]
    fn loads_python_client_token_file() {
        let (_dir, storage) = storage();
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(
            storage.path(),
            r#"{
                "token": "ya29.abc",
                "refresh_token": "1//xyz",
                "token_uri": "https://oauth2.googleapis.com/token",
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "secret",
                "scopes": ["https://www.googleapis.com/auth/calendar.readonly"],
                "universe_domain": "googleapis.com",
                "expiry": "2026-01-26T10:00:00.123456Z"
            }"#,
        )
        .unwrap();

        let token = storage.load().unwrap();
        assert_eq!(token.access_token, "ya29.abc");
        assert_eq!(token.refresh_token.as_deref(), Some("1//xyz"));
        assert_eq!(token.scopes, vec![GOOGLE_SCOPE.to_string()]);
        assert_eq!(
            token.expires_at.unwrap().to_rfc3339(),
            "2026-01-26T10:00:00.123456+00:00"
        );
    }

    const GOOGLE_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
}
