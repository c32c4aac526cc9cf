use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::clients::google_client::GoogleClient;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::service::notification_message_service::OutgoingMail;

/// Authorization obtained once per poller pass.
#[derive(Debug, Clone)]
pub struct MailAuth {
    pub access_token: String,
    /// Display name of the signed-in account, if the lookup succeeded.
    pub sender_name: Option<String>,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    /// Load and validate the stored credential, refreshing it when needed.
    async fn authorize(&self) -> Result<MailAuth>;

    async fn send(&self, auth: &MailAuth, mail: &OutgoingMail) -> Result<()>;
}

pub struct GmailSender {
    client: GoogleClient,
    credentials: CredentialStore,
}

impl GmailSender {
    pub fn new(client: GoogleClient, credentials: CredentialStore) -> Self {
        Self { client, credentials }
    }
}

#[async_trait]
impl MailSender for GmailSender {
    async fn authorize(&self) -> Result<MailAuth> {
        let credential = self.credentials.load_valid(&self.client, Utc::now()).await?;
        let sender_name = match self.client.user_info(&credential.token).await {
            Ok(info) => info.name,
            Err(err) => {
                warn!(error = %err, "could not look up account name, sending without it");
                None
            }
        };
        Ok(MailAuth {
            access_token: credential.token,
            sender_name,
        })
    }

    async fn send(&self, auth: &MailAuth, mail: &OutgoingMail) -> Result<()> {
        let sent = self
            .client
            .send_raw_message(&auth.access_token, &mail.encode_raw())
            .await?;
        debug!(
            message_id = %sent.id,
            thread_id = sent.thread_id.as_deref().unwrap_or("-"),
            recipients = mail.to.len(),
            "gmail accepted message"
        );
        Ok(())
    }
}
