use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use eventPlanner::error::{PlannerError, Result};
use eventPlanner::models::event::Event;
use eventPlanner::service::mail_service::{MailAuth, MailSender};
use eventPlanner::service::notification_message_service::OutgoingMail;
use eventPlanner::store::{EventStore, SharedStore};
use eventPlanner::tasks::notification_loop::{TickReport, notification_tick};

struct ScriptedSender {
    authorize_fails: bool,
    failing_subject_fragment: Option<String>,
    authorize_calls: AtomicUsize,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl ScriptedSender {
    fn ok() -> Self {
        Self {
            authorize_fails: false,
            failing_subject_fragment: None,
            authorize_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn failing_for(fragment: &str) -> Self {
        Self {
            failing_subject_fragment: Some(fragment.to_string()),
            ..Self::ok()
        }
    }

    fn unauthorized() -> Self {
        Self {
            authorize_fails: true,
            ..Self::ok()
        }
    }

    fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MailSender for ScriptedSender {
    async fn authorize(&self) -> Result<MailAuth> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        if self.authorize_fails {
            return Err(PlannerError::Credential("no stored credential".to_string()));
        }
        Ok(MailAuth {
            access_token: "token".to_string(),
            sender_name: Some("Ada".to_string()),
        })
    }

    async fn send(&self, _auth: &MailAuth, mail: &OutgoingMail) -> Result<()> {
        self.sent.lock().unwrap().push(mail.clone());
        match &self.failing_subject_fragment {
            Some(fragment) if mail.subject.contains(fragment.as_str()) => {
                Err(PlannerError::Provider("503 backend error".to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, 2)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn event(title: &str, notify_date: Option<NaiveDateTime>) -> Event {
    Event::new(
        title,
        format!("{} details", title),
        now() + Duration::days(1),
        vec!["guest@example.com".to_string()],
        notify_date,
    )
}

fn shared(events: Vec<Event>) -> (tempfile::TempDir, SharedStore) {
    let dir = tempfile::tempdir().unwrap();
    let mut store = EventStore::new(dir.path().join("events.json"));
    for event in events {
        store.add(event);
    }
    store.save().unwrap();
    (dir, store.into_shared())
}

#[tokio::test]
async fn events_without_notify_date_are_never_attempted() {
    let (_dir, store) = shared(vec![event("no notify", None), event("also none", None)]);
    let sender = ScriptedSender::ok();

    let report = notification_tick(&store, &sender, now()).await.unwrap();

    assert_eq!(report, TickReport::default());
    assert!(sender.sent().is_empty());
    assert_eq!(sender.authorize_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn past_due_event_gets_exactly_one_attempt_and_is_marked_sent() {
    let (dir, store) = shared(vec![event("dentist", Some(now() - Duration::minutes(1)))]);
    let sender = ScriptedSender::ok();

    let report = notification_tick(&store, &sender, now()).await.unwrap();

    assert_eq!(report, TickReport { due: 1, sent: 1, failed: 0 });
    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["guest@example.com".to_string()]);
    assert!(sent[0].subject.contains("dentist"));
    assert!(sent[0].body.ends_with("From Ada using Event Planner."));
    assert!(store.lock().await.events()[0].sent);

    let persisted = EventStore::load(dir.path().join("events.json")).unwrap();
    assert!(persisted.events()[0].sent);
}

#[tokio::test]
async fn sent_events_are_not_attempted_again() {
    let (_dir, store) = shared(vec![event("dentist", Some(now() - Duration::minutes(5)))]);
    let sender = ScriptedSender::ok();

    notification_tick(&store, &sender, now()).await.unwrap();
    let second = notification_tick(&store, &sender, now() + Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(second.due, 0);
    assert_eq!(sender.sent().len(), 1);
}

#[tokio::test]
async fn notification_thirty_seconds_ahead_is_not_selected() {
    let (_dir, store) = shared(vec![event("soon", Some(now() + Duration::seconds(30)))]);
    let sender = ScriptedSender::ok();

    let report = notification_tick(&store, &sender, now()).await.unwrap();

    assert_eq!(report.due, 0);
    assert!(sender.sent().is_empty());
    assert!(!store.lock().await.events()[0].sent);
}

#[tokio::test]
async fn failed_send_stays_due_for_next_tick() {
    let (_dir, store) = shared(vec![
        event("flaky", Some(now() - Duration::minutes(2))),
        event("fine", Some(now() - Duration::minutes(2))),
    ]);
    let sender = ScriptedSender::failing_for("flaky");

    let first = notification_tick(&store, &sender, now()).await.unwrap();
    assert_eq!(first, TickReport { due: 2, sent: 1, failed: 1 });

    {
        let store = store.lock().await;
        assert!(!store.events()[0].sent);
        assert!(store.events()[1].sent);
    }

    let second = notification_tick(&store, &sender, now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(second, TickReport { due: 1, sent: 0, failed: 1 });
    assert_eq!(sender.sent().len(), 3);
}

#[tokio::test]
async fn credential_failure_abandons_the_whole_pass() {
    let (_dir, store) = shared(vec![event("dentist", Some(now() - Duration::minutes(1)))]);
    let sender = ScriptedSender::unauthorized();

    let err = notification_tick(&store, &sender, now()).await.unwrap_err();

    assert!(matches!(err, PlannerError::Credential(_)));
    assert!(sender.sent().is_empty());
    assert!(!store.lock().await.events()[0].sent);
}

struct DeletingSender {
    store: SharedStore,
}

#[async_trait::async_trait]
impl MailSender for DeletingSender {
    async fn authorize(&self) -> Result<MailAuth> {
        Ok(MailAuth {
            access_token: "token".to_string(),
            sender_name: None,
        })
    }

    async fn send(&self, _auth: &MailAuth, _mail: &OutgoingMail) -> Result<()> {
        // The user deletes the first event while its send is in flight.
        let mut store = self.store.lock().await;
        store.remove_at(0)?;
        store.save()
    }
}

#[tokio::test]
async fn delete_during_send_does_not_flag_a_different_event() {
    let (_dir, store) = shared(vec![
        event("in flight", Some(now() - Duration::minutes(1))),
        event("bystander", Some(now() + Duration::hours(1))),
    ]);
    let sender = DeletingSender { store: store.clone() };

    let report = notification_tick(&store, &sender, now()).await.unwrap();

    assert_eq!(report.sent, 1);
    let store = store.lock().await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.events()[0].title, "bystander");
    assert!(!store.events()[0].sent);
}

struct ReschedulingSender {
    store: SharedStore,
    moved_to: NaiveDateTime,
}

#[async_trait::async_trait]
impl MailSender for ReschedulingSender {
    async fn authorize(&self) -> Result<MailAuth> {
        Ok(MailAuth {
            access_token: "token".to_string(),
            sender_name: None,
        })
    }

    async fn send(&self, _auth: &MailAuth, _mail: &OutgoingMail) -> Result<()> {
        // The user moves the reminder to a later date while it is being mailed.
        let mut store = self.store.lock().await;
        let current = store.events()[0].clone();
        let mut edited = current.clone();
        edited.notify_date = Some(self.moved_to);
        store.replace(&current.id, edited)?;
        store.save()
    }
}

#[tokio::test]
async fn edit_during_send_keeps_rescheduled_notification_pending() {
    let (dir, store) = shared(vec![event("review", Some(now() - Duration::minutes(1)))]);
    let moved_to = now() + Duration::days(3);
    let sender = ReschedulingSender {
        store: store.clone(),
        moved_to,
    };

    let report = notification_tick(&store, &sender, now()).await.unwrap();
    assert_eq!(report.sent, 1);

    {
        let store = store.lock().await;
        assert_eq!(store.events()[0].notify_date, Some(moved_to));
        assert!(!store.events()[0].sent);
    }
    let persisted = EventStore::load(dir.path().join("events.json")).unwrap();
    assert!(!persisted.events()[0].sent);

    let later = notification_tick(&store, &sender, moved_to).await.unwrap();
    assert_eq!(later.due, 1);
}

#[tokio::test]
async fn events_added_by_another_store_are_picked_up() {
    let (dir, store) = shared(vec![]);
    let sender = ScriptedSender::ok();

    let mut other = EventStore::load(dir.path().join("events.json")).unwrap();
    other.add(event("added elsewhere", Some(now() - Duration::minutes(1))));
    other.save().unwrap();

    let report = notification_tick(&store, &sender, now()).await.unwrap();

    assert_eq!(report, TickReport { due: 1, sent: 1, failed: 0 });
    let persisted = EventStore::load(dir.path().join("events.json")).unwrap();
    assert_eq!(persisted.len(), 1);
    assert!(persisted.events()[0].sent);
}

#[tokio::test]
async fn unreadable_events_file_abandons_the_pass_without_overwriting() {
    let (dir, store) = shared(vec![event("dentist", Some(now() - Duration::minutes(1)))]);
    let path = dir.path().join("events.json");
    std::fs::write(&path, "[{not json").unwrap();
    let sender = ScriptedSender::ok();

    let err = notification_tick(&store, &sender, now()).await.unwrap_err();

    assert!(matches!(err, PlannerError::Store(_)));
    assert!(sender.sent().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{not json");
}
