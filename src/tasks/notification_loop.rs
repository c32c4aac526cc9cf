use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::event::Event;
use crate::service::mail_service::MailSender;
use crate::service::notification_message_service::NotificationMessageService;
use crate::store::SharedStore;

/// Outcome of one pass over the event list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Poll for due notifications until `cancel` fires. The first pass runs
/// immediately, then one pass per `interval`.
pub async fn run_notification_loop<S: MailSender + ?Sized>(
    store: SharedStore,
    sender: Arc<S>,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(interval_secs = interval.as_secs(), "notification loop started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let now = Local::now().naive_local();
        match notification_tick(&store, sender.as_ref(), now).await {
            Ok(report) if report.due > 0 => info!(
                due = report.due,
                sent = report.sent,
                failed = report.failed,
                "notification pass finished"
            ),
            Ok(_) => debug!("no notifications due"),
            Err(err) => warn!(error = %err, "notification pass abandoned, retrying next tick"),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }
    info!("notification loop stopped");
}

/// One pass: attempt every due, unsent notification exactly once.
///
/// The events file is re-read first so events added from other terminals are
/// seen. Fails only when that read or authorization fails, in which case
/// nothing is sent. Individual send failures are logged and leave the event
/// due for the next pass. Each delivery is recorded and saved right away.
pub async fn notification_tick<S: MailSender + ?Sized>(
    store: &SharedStore,
    sender: &S,
    now: NaiveDateTime,
) -> Result<TickReport> {
    let due = {
        let mut store = store.lock().await;
        store.reload()?;
        store.due_notifications(now)
    };
    let mut report = TickReport {
        due: due.len(),
        ..TickReport::default()
    };
    if due.is_empty() {
        return Ok(report);
    }

    let auth = sender.authorize().await?;

    for event in &due {
        let mail = NotificationMessageService::build_message(event, auth.sender_name.as_deref());
        match sender.send(&auth, &mail).await {
            Ok(()) => {
                report.sent += 1;
                record_delivery(store, event).await;
            }
            Err(err) => {
                report.failed += 1;
                warn!(event_id = %event.id, error = %err, "notification not sent");
            }
        }
    }
    Ok(report)
}

async fn record_delivery(store: &SharedStore, delivered: &Event) {
    let mut store = store.lock().await;
    if let Err(err) = store.reload() {
        warn!(event_id = %delivered.id, error = %err, "cannot re-read events, delivery not recorded");
        return;
    }
    if !store.mark_sent(delivered) {
        warn!(event_id = %delivered.id, "notification sent but event was removed or edited meanwhile");
        return;
    }
    info!(event_id = %delivered.id, title = %delivered.title, "notification sent");
    if let Err(err) = store.save() {
        warn!(error = %err, "failed to save events after notification");
    }
}
