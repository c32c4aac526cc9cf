use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::clients::google_client::GoogleClient;
use crate::config::Settings;
use crate::credentials::CredentialStore;
use crate::error::{PlannerError, Result};
use crate::handlers::shell;
use crate::service::mail_service::{GmailSender, MailSender};
use crate::store::{EventStore, SharedStore};
use crate::tasks::notification_loop;
use crate::tasks::task_runner::{RunningTasks, TaskRunner};

/// Spawn the notification poller over `store`.
pub fn start_background<S: MailSender + 'static>(
    store: SharedStore,
    sender: Arc<S>,
    poll_interval: Duration,
) -> RunningTasks {
    let mut task_runner = TaskRunner::new();
    task_runner.add_task(move |cancel| async move {
        notification_loop::run_notification_loop(store, sender, poll_interval, cancel).await;
    });
    task_runner.start_all()
}

pub async fn run_planner(settings: Settings, headless: bool) -> Result<()> {
    let mut store = EventStore::new(&settings.events_file);
    store.reload()?;
    let store = store.into_shared();
    let sender = Arc::new(GmailSender::new(
        GoogleClient::new(),
        CredentialStore::new(&settings.credentials_file),
    ));
    info!(events = %settings.events_file.display(), "planner starting");

    let running = start_background(store.clone(), sender, settings.poll_interval);

    let outcome = if headless {
        println!("Notification poller running. Press Ctrl-C to stop.");
        tokio::signal::ctrl_c().await.map_err(PlannerError::from)
    } else {
        shell::run_shell(store.clone(), settings.clone()).await
    };

    // Every change is already on disk.
    running.shutdown().await;
    info!("planner stopped");
    outcome
}
