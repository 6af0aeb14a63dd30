use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::oauth::{AuthError, GmailApiTokenResponse};
use crate::error::AppResult;

/// Tokens expiring within this window are treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl StoredCredential {
    /// Google omits the refresh token on refresh responses, so the previous
    /// one is carried over when the response has none. An `expires_in` that
    /// does not fit a timestamp is a bad response.
    pub fn from_token_response(
        resp: GmailApiTokenResponse,
        previous_refresh_token: Option<String>,
        requested_scopes: &[String],
    ) -> Result<Self, AuthError> {
        let expires_at = i64::try_from(resp.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                tracing::error!(
                    "Token response has out of range expires_in: {}",
                    resp.expires_in
                );
                AuthError::BadOauthResponse
            })?;

        let scopes = match resp.scope {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => requested_scopes.to_vec(),
        };

        Ok(Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh_token),
            expires_at,
            scopes,
        })
    }
}

/// Persistence for the mail provider's OAuth token
pub trait CredentialStore {
    fn load(&self) -> AppResult<Option<StoredCredential>>;

    fn save(&self, credential: &StoredCredential) -> AppResult<()>;

    fn is_valid(&self, credential: &StoredCredential) -> bool {
        !credential.access_token.is_empty()
            && credential.expires_at - Duration::seconds(EXPIRY_SKEW_SECS) > Utc::now()
    }
}

/// Token kept as JSON on disk between runs
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> AppResult<Option<StoredCredential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<StoredCredential>(&json) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable token file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &StoredCredential) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(credential)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("Saved Gmail token to {}", self.path.display());
        Ok(())
    }
}
