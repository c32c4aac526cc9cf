//! Stored OAuth token bundle used for outbound mail.
//!
//! The file's presence is what enables notifications. Older planner releases
//! stored the bundle as a JSON string wrapping the object; both shapes load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clients::google_client::{DEFAULT_TOKEN_URI, GoogleClient, TokenResponse};
use crate::error::{PlannerError, Result};

/// Tokens this close to expiry are treated as expired.
pub const REFRESH_THRESHOLD_SECS: i64 = 225;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - Duration::seconds(REFRESH_THRESHOLD_SECS),
            None => false,
        }
    }

    /// Fold a token endpoint response into this credential. Google usually
    /// omits the refresh token on refresh, so the old one is kept.
    pub fn apply_token_response(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = response.access_token;
        if let Some(refresh_token) = response.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(refresh_token);
        }
        self.expiry = response
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Credential> {
        if !self.exists() {
            return Err(PlannerError::Credential(format!(
                "no stored credential at {}; sign in first",
                self.path.display()
            )));
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            PlannerError::Credential(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_credential(&contents).map_err(|e| {
            PlannerError::Credential(format!("malformed credential file {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        let contents = serde_json::to_string_pretty(credential)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, contents)?;

        // Owner-only, the file holds OAuth tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Delete the stored credential. Absent files are fine.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the credential and refresh it first if it has expired.
    pub async fn load_valid(&self, client: &GoogleClient, now: DateTime<Utc>) -> Result<Credential> {
        let mut credential = self.load()?;
        if !credential.is_expired(now) {
            return Ok(credential);
        }

        let refresh_token = credential.refresh_token.clone().ok_or_else(|| {
            PlannerError::Credential("access token expired and no refresh token is stored".to_string())
        })?;

        let response = client
            .refresh_access_token(
                &credential.token_uri,
                &credential.client_id,
                &credential.client_secret,
                &refresh_token,
            )
            .await
            .map_err(|e| PlannerError::Credential(format!("failed to refresh access token: {}", e)))?;

        credential.apply_token_response(response, now);
        self.save(&credential)?;
        info!(path = %self.path.display(), "refreshed stored access token");
        Ok(credential)
    }
}

fn parse_credential(contents: &str) -> serde_json::Result<Credential> {
    match serde_json::from_str::<serde_json::Value>(contents)? {
        serde_json::Value::String(inner) => serde_json::from_str(&inner),
        value => serde_json::from_value(value),
    }
}
