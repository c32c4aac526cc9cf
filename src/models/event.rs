use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire format for every persisted timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Event {
    /// Empty only for records read from files that predate ids; the store
    /// fills those in on load.
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
    pub emails: Vec<String>,
    #[serde(with = "timestamp::option", default)]
    pub notify_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub sent: bool,
}

impl Event {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDateTime,
        emails: Vec<String>,
        notify_date: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            id: new_event_id(),
            title: title.into(),
            description: description.into(),
            date: truncate_to_seconds(date),
            emails,
            notify_date: notify_date.map(truncate_to_seconds),
            sent: false,
        }
    }

    /// True when the poller should attempt delivery at `now`.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        match self.notify_date {
            Some(notify_date) => !self.sent && now >= notify_date,
            None => false,
        }
    }

    pub fn notification_status(&self, now: NaiveDateTime, failed_after: Duration) -> NotificationStatus {
        let Some(notify_date) = self.notify_date else {
            return NotificationStatus::NotScheduled;
        };
        if self.sent {
            return NotificationStatus::Sent;
        }
        // A deadline past the calendar's range never arrives.
        match notify_date.checked_add_signed(failed_after) {
            Some(deadline) if now >= deadline => NotificationStatus::Failed,
            _ => NotificationStatus::Pending,
        }
    }

    pub fn list_line(&self) -> String {
        format!("{} - {}", self.title, self.date.format(TIMESTAMP_FORMAT))
    }
}

/// Display-only classification of an event's notification. It says nothing
/// about what the poller will do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    NotScheduled,
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            NotificationStatus::NotScheduled => None,
            NotificationStatus::Pending => {
                Some("Notification will be sent when notification time arrives.")
            }
            NotificationStatus::Sent => Some("The notification was sent successfully!"),
            NotificationStatus::Failed => Some(
                "The notification was not sent because an error occurred. \
                 Check your Internet connection and the correctness of the entered data. \
                 A notification will be sent as soon as the issue is resolved.",
            ),
        }
    }
}

fn truncate_to_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}

/// `YYYY-MM-DD HH:MM:SS` (de)serialization for naive local timestamps.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        use super::super::TIMESTAMP_FORMAT;

        pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_some(&value.format(TIMESTAMP_FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.is_empty() => NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}
