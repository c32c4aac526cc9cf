use serde::Deserialize;

use crate::error::{PlannerError, Result};

pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
pub const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub id: String,
    #[serde(default, rename = "threadId")]
    pub thread_id: Option<String>,
}

/// Minimal HTTP wrapper over the Google endpoints the planner needs.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    userinfo_url: String,
    send_url: String,
}

impl Default for GoogleClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleClient {
    pub fn new() -> Self {
        Self::with_endpoints(USERINFO_URL, GMAIL_SEND_URL)
    }

    pub fn with_endpoints(userinfo_url: impl Into<String>, send_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            userinfo_url: userinfo_url.into(),
            send_url: send_url.into(),
        }
    }

    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        read_json(response, "userinfo lookup").await
    }

    /// Send an already encoded (base64url) RFC 822 message as the signed-in user.
    pub async fn send_raw_message(&self, access_token: &str, raw: &str) -> Result<SentMessage> {
        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await?;
        read_json(response, "message send").await
    }

    pub async fn refresh_access_token(
        &self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        read_json(response, "token refresh").await
    }

    pub async fn exchange_code(
        &self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;
        read_json(response, "authorization code exchange").await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(PlannerError::Provider(format!(
            "{} failed with status {}: {}",
            what, status, text
        )));
    }

    serde_json::from_str(&text).map_err(|e| {
        PlannerError::Provider(format!("failed to parse {} response: {}\nRaw body: {}", what, e, text))
    })
}
