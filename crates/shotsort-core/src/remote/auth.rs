//! OAuth access tokens for the Drive backend.
//!
//! Reads an authorized-user token file (the JSON written by Google's
//! installed-app consent flow) and refreshes the access token with the
//! stored refresh token when it is missing or about to expire. The
//! interactive consent flow itself is not handled here.

use crate::config::{AppConfig, DriveConfig, NetworkConfig};
use crate::{Result, ShotsortError};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

fn default_token_uri() -> String {
    DriveConfig::TOKEN_URL.to_string()
}

/// Contents of an authorized-user token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// Current access token, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields we do not use (scopes, account, ...), written back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizedUser {
    /// True if the stored access token can be used at `now`.
    ///
    /// A token without an expiry is trusted as-is.
    pub fn has_fresh_token(&self, now: DateTime<Utc>) -> bool {
        let skew = ChronoDuration::from_std(DriveConfig::TOKEN_EXPIRY_SKEW)
            .unwrap_or_else(|_| ChronoDuration::seconds(60));
        match (&self.token, self.expiry) {
            (Some(token), _) if token.is_empty() => false,
            (Some(_), Some(expiry)) => expiry - skew > now,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Response of the OAuth token endpoint for a refresh grant.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Hands out valid access tokens, refreshing and persisting as needed.
pub struct TokenStore {
    path: PathBuf,
    user: Mutex<AuthorizedUser>,
    http: reqwest::Client,
}

impl TokenStore {
    /// Load the token file at `path`.
    ///
    /// A missing or malformed file is a startup error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = std::fs::read_to_string(&path).map_err(|e| ShotsortError::BackendInit {
            message: format!(
                "Cannot read token file {}: {}. Complete the OAuth consent flow first.",
                path.display(),
                e
            ),
        })?;
        let user: AuthorizedUser =
            serde_json::from_str(&raw).map_err(|e| ShotsortError::BackendInit {
                message: format!("Invalid token file {}: {}", path.display(), e),
            })?;
        Self::from_user(path, user)
    }

    /// Wrap an already-parsed token; refreshed tokens are written to `path`.
    pub fn from_user(path: impl Into<PathBuf>, user: AuthorizedUser) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ShotsortError::BackendInit {
                message: format!("Failed to build OAuth HTTP client: {}", e),
            })?;

        Ok(Self {
            path: path.into(),
            user: Mutex::new(user),
            http,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return a usable access token, refreshing it first if needed.
    pub async fn access_token(&self) -> Result<String> {
        let mut user = self.user.lock().await;
        if !user.has_fresh_token(Utc::now()) {
            self.refresh(&mut user).await?;
        }
        user.token.clone().ok_or_else(|| ShotsortError::Auth {
            message: "Token endpoint returned no access token".to_string(),
        })
    }

    async fn refresh(&self, user: &mut AuthorizedUser) -> Result<()> {
        debug!("Refreshing access token via {}", user.token_uri);

        let params = [
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", user.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&user.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| ShotsortError::Network {
                message: format!("Token refresh request failed: {}", e),
                source: Some(e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShotsortError::Auth {
                message: format!("Token refresh returned {}: {}", status, body),
            });
        }

        let refreshed: RefreshResponse = response.json().await.map_err(|e| ShotsortError::Auth {
            message: format!("Invalid token refresh response: {}", e),
        })?;

        user.token = Some(refreshed.access_token);
        user.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));
        info!("Access token refreshed");

        if let Err(e) = self.persist(user).await {
            warn!("Could not save refreshed token to {}: {}", self.path.display(), e);
        }
        Ok(())
    }

    async fn persist(&self, user: &AuthorizedUser) -> Result<()> {
        let json = serde_json::to_string_pretty(user)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ShotsortError::io_with_path(e, &self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(token: Option<&str>, expiry: Option<DateTime<Utc>>) -> AuthorizedUser {
        AuthorizedUser {
            token: token.map(str::to_string),
            refresh_token: "refresh".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            token_uri: default_token_uri(),
            expiry,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        assert!(user(Some("t"), Some(now + ChronoDuration::hours(1))).has_fresh_token(now));
        assert!(!user(Some("t"), Some(now + ChronoDuration::seconds(10))).has_fresh_token(now));
        assert!(!user(Some("t"), Some(now - ChronoDuration::hours(1))).has_fresh_token(now));
        assert!(user(Some("t"), None).has_fresh_token(now));
        assert!(!user(Some(""), None).has_fresh_token(now));
        assert!(!user(None, None).has_fresh_token(now));
    }

    #[test]
    fn test_parses_authorized_user_file() {
        let json = r#"{
            "token": "ya29.abc",
            "refresh_token": "1//r",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "s",
            "scopes": ["https://www.googleapis.com/auth/drive.file"],
            "expiry": "2030-01-01T00:00:00.000000Z"
        }"#;
        let user: AuthorizedUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.token.as_deref(), Some("ya29.abc"));
        assert!(user.expiry.is_some());
        assert!(user.extra.contains_key("scopes"));

        let written = serde_json::to_value(&user).unwrap();
        assert!(written.get("scopes").is_some());
    }

    #[test]
    fn test_missing_file_is_startup_error() {
        let dir = TempDir::new().unwrap();
        let err = TokenStore::load(dir.path().join("token.json"))
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_fresh_token_needs_no_network() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::from_user(
            dir.path().join("token.json"),
            user(Some("cached"), Some(Utc::now() + ChronoDuration::hours(1))),
        )
        .unwrap();
        assert_eq!(store.access_token().await.unwrap(), "cached");
    }
}
