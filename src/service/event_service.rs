use chrono::{Duration, NaiveDateTime};

use crate::credentials::CredentialStore;
use crate::error::{PlannerError, Result};
use crate::models::event::{Event, TIMESTAMP_FORMAT};
use crate::store::EventStore;

const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%y %H:%M",
];

/// Raw form fields as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub date: String,
    pub emails: String,
    pub notify_at: Option<String>,
}

impl EventInput {
    /// Prefill a form from an existing event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date.format(TIMESTAMP_FORMAT).to_string(),
            emails: event.emails.join(", "),
            notify_at: event
                .notify_date
                .map(|date| date.format(TIMESTAMP_FORMAT).to_string()),
        }
    }

    pub fn into_event(self) -> Result<Event> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(PlannerError::InvalidInput("title must not be empty".to_string()));
        }
        let date = parse_datetime(&self.date)?;
        let notify_date = match self.notify_at.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_datetime(raw)?),
            _ => None,
        };
        Ok(Event::new(
            title,
            self.description.trim(),
            date,
            split_emails(&self.emails),
            notify_date,
        ))
    }
}

pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            PlannerError::InvalidInput(format!(
                "unrecognized date/time {:?}, expected YYYY-MM-DD HH:MM",
                raw
            ))
        })
}

/// Comma-separated recipients, trimmed; empty entries are dropped.
pub fn split_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct EventService;

impl EventService {
    pub fn create(
        store: &mut EventStore,
        input: EventInput,
        credentials: &CredentialStore,
    ) -> Result<Event> {
        let event = input.into_event()?;
        ensure_notify_allowed(&event, credentials)?;
        store.add(event.clone());
        Ok(event)
    }

    /// Replace the selected event wholesale with the new form contents.
    pub fn edit(
        store: &mut EventStore,
        selector: &str,
        input: EventInput,
        credentials: &CredentialStore,
    ) -> Result<Event> {
        let id = store.resolve(selector)?.id.clone();
        let event = input.into_event()?;
        ensure_notify_allowed(&event, credentials)?;
        store.replace(&id, event)?;
        store
            .get(&id)
            .cloned()
            .ok_or_else(|| PlannerError::EventNotFound(id))
    }

    pub fn delete(store: &mut EventStore, selector: &str) -> Result<Event> {
        let id = store.resolve(selector)?.id.clone();
        store.remove(&id)
    }

    pub fn render_list(store: &EventStore) -> String {
        if store.is_empty() {
            return "No events yet.".to_string();
        }
        store
            .events()
            .iter()
            .enumerate()
            .map(|(index, event)| format!("[{}] {}", index, event.list_line()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_details(event: &Event, now: NaiveDateTime, failed_after: Duration) -> String {
        let mut lines = vec![
            format!("Name: {}", event.title),
            format!("Description: {}", event.description),
            format!("Date: {}", event.date.format(TIMESTAMP_FORMAT)),
            format!("Emails: {}", event.emails.join(", ")),
        ];
        if let Some(notify_date) = event.notify_date {
            lines.push(format!("Notification date: {}", notify_date.format(TIMESTAMP_FORMAT)));
            if let Some(message) = event.notification_status(now, failed_after).message() {
                lines.push(message.to_string());
            }
        }
        lines.push(format!("Id: {}", event.id));
        lines.join("\n")
    }
}

fn ensure_notify_allowed(event: &Event, credentials: &CredentialStore) -> Result<()> {
    if event.notify_date.is_some() && !credentials.exists() {
        return Err(PlannerError::Credential(
            "To use notifications, please sign in to your Google Account first (`login`).".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(title: &str, notify_at: Option<&str>) -> EventInput {
        EventInput {
            title: title.to_string(),
            description: "  notes  ".to_string(),
            date: "2026-07-04 12:00".to_string(),
            emails: "a@example.com, ,b@example.com ".to_string(),
            notify_at: notify_at.map(str::to_string),
        }
    }

    #[test]
    fn parse_datetime_accepts_several_shapes() {
        let expected = NaiveDate::from_ymd_opt(2026, 7, 4)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        for raw in [
            "2026-07-04 12:30",
            "2026-07-04 12:30:00",
            "2026-07-04T12:30",
            " 07/04/26 12:30 ",
        ] {
            assert_eq!(parse_datetime(raw).unwrap(), expected, "{}", raw);
        }
        assert!(matches!(parse_datetime("tomorrow"), Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn into_event_trims_and_splits() {
        let event = input("Party", None).into_event().unwrap();
        assert_eq!(event.description, "notes");
        assert_eq!(event.emails, vec!["a@example.com", "b@example.com"]);
        assert_eq!(event.notify_date, None);
        assert!(!event.sent);
    }

    #[test]
    fn into_event_rejects_blank_title_and_bad_notify_date() {
        assert!(input("  ", None).into_event().is_err());
        assert!(input("Party", Some("someday")).into_event().is_err());
    }

    #[test]
    fn notify_requires_stored_credential() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = CredentialStore::new(dir.path().join("credentials.json"));
        let mut store = EventStore::new(dir.path().join("events.json"));

        let err = EventService::create(&mut store, input("Party", Some("2026-07-04 11:00")), &credentials)
            .unwrap_err();
        assert!(matches!(err, PlannerError::Credential(_)));
        assert!(store.is_empty());

        EventService::create(&mut store, input("Party", None), &credentials).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failed_edit_leaves_event_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = CredentialStore::new(dir.path().join("credentials.json"));
        let mut store = EventStore::new(dir.path().join("events.json"));
        EventService::create(&mut store, input("Party", None), &credentials).unwrap();

        let mut bad = input("Renamed", None);
        bad.date = "32/13/99".to_string();
        assert!(EventService::edit(&mut store, "0", bad, &credentials).is_err());
        assert_eq!(store.events()[0].title, "Party");
    }

    #[test]
    fn render_details_includes_failed_status() {
        let mut event = input("Party", None).into_event().unwrap();
        let notify = NaiveDate::from_ymd_opt(2026, 7, 4)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        event.notify_date = Some(notify);

        let text = EventService::render_details(&event, notify + Duration::minutes(2), Duration::minutes(1));
        assert!(text.contains("Name: Party"));
        assert!(text.contains("Emails: a@example.com, b@example.com"));
        assert!(text.contains("Notification date: 2026-07-04 11:00:00"));
        assert!(text.contains("The notification was not sent because an error occurred."));
        assert!(!text.contains("will be sent when notification time arrives"));
    }

    #[test]
    fn render_list_numbers_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = CredentialStore::new(dir.path().join("credentials.json"));
        let mut store = EventStore::new(dir.path().join("events.json"));
        assert_eq!(EventService::render_list(&store), "No events yet.");
        EventService::create(&mut store, input("Party", None), &credentials).unwrap();
        assert_eq!(EventService::render_list(&store), "[0] Party - 2026-07-04 12:00:00");
    }
}
