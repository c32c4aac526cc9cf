//! Installed-app OAuth sign-in against Google.
//!
//! The consent page redirects the browser to a loopback server started with
//! warp; the received code is exchanged for tokens and stored as the
//! credential that enables notifications.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;
use warp::Filter;

use crate::clients::google_client::{DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI, GoogleClient};
use crate::config::Settings;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{PlannerError, Result};

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

const SUCCESS_PAGE: &str = "<html><body>\
    <h1>Authentication successful!</h1>\
    <p>You can close this window and return to the terminal.</p>\
    </body></html>";

const FAILURE_PAGE: &str = "<html><body>\
    <h1>Authentication failed.</h1>\
    <p>Return to the terminal for details.</p>\
    </body></html>";

/// OAuth client registration as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PlannerError::Auth(format!("cannot read client secret file {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(contents)
            .map_err(|e| PlannerError::Auth(format!("malformed client secret file: {}", e)))?;
        file.installed.or(file.web).ok_or_else(|| {
            PlannerError::Auth("client secret file has neither an `installed` nor a `web` section".to_string())
        })
    }
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{}/callback", port)
}

pub fn consent_url(secrets: &ClientSecrets, redirect_uri: &str, state: &str) -> Result<String> {
    let scope = SCOPES.join(" ");
    let url = reqwest::Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| PlannerError::Auth(format!("invalid auth_uri {}: {}", secrets.auth_uri, e)))?;
    Ok(url.to_string())
}

/// Validate the query string the browser brings back to the loopback server.
pub fn callback_outcome(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> std::result::Result<String, String> {
    if let Some(error) = params.get("error") {
        return Err(format!("consent was not granted: {}", error));
    }
    match params.get("state") {
        Some(state) if state == expected_state => {}
        _ => return Err("state mismatch in OAuth callback".to_string()),
    }
    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or_else(|| "no code in OAuth callback".to_string())
}

/// Run the whole sign-in flow and store the resulting credential.
pub async fn login(settings: &Settings, client: &GoogleClient) -> Result<Credential> {
    let secrets = ClientSecrets::load(&settings.client_secret_file)?;
    let state = Uuid::new_v4().to_string();
    let redirect = redirect_uri(settings.oauth_redirect_port);
    let url = consent_url(&secrets, &redirect, &state)?;

    println!("\nOpen this URL in your browser to sign in:\n");
    println!("{}\n", url);
    if let Err(err) = open::that(&url) {
        warn!(error = %err, "could not open browser automatically");
    }

    let code = wait_for_callback(settings.oauth_redirect_port, state).await?;
    info!("received authorization code, exchanging for tokens");

    let tokens = client
        .exchange_code(
            &secrets.token_uri,
            &secrets.client_id,
            &secrets.client_secret,
            &code,
            &redirect,
        )
        .await?;

    let mut credential = Credential {
        token: String::new(),
        refresh_token: None,
        token_uri: secrets.token_uri,
        client_id: secrets.client_id,
        client_secret: secrets.client_secret,
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        expiry: None,
    };
    credential.apply_token_response(tokens, Utc::now());

    CredentialStore::new(&settings.credentials_file).save(&credential)?;
    Ok(credential)
}

async fn wait_for_callback(port: u16, expected_state: String) -> Result<String> {
    let (tx, mut rx) = mpsc::channel::<std::result::Result<String, String>>(1);

    let callback = warp::get()
        .and(warp::path("callback"))
        .and(warp::query::<HashMap<String, String>>())
        .map(move |params: HashMap<String, String>| {
            let outcome = callback_outcome(&params, &expected_state);
            let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
            let _ = tx.try_send(outcome);
            warp::reply::html(page)
        });

    let server = tokio::spawn(warp::serve(callback).run(([127, 0, 0, 1], port)));
    let outcome = rx.recv().await;
    server.abort();

    match outcome {
        Some(Ok(code)) => Ok(code),
        Some(Err(reason)) => Err(PlannerError::Auth(reason)),
        None => Err(PlannerError::Auth("callback server stopped before a response arrived".to_string())),
    }
}
