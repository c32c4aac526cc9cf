use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

use crate::models::event::{Event, TIMESTAMP_FORMAT};

/// One outgoing notification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Single-part `text/plain` RFC 822 message.
    pub fn to_mime(&self) -> String {
        let to = single_line(&self.to.join(", "));
        let subject = encode_header(&single_line(&self.subject));
        let (charset, encoding, body) = if self.body.is_ascii() {
            ("us-ascii", "7bit", self.body.replace('\n', "\r\n"))
        } else {
            ("utf-8", "base64", wrap_base64(&STANDARD.encode(self.body.as_bytes())))
        };

        format!(
            "Content-Type: text/plain; charset=\"{charset}\"\r\n\
             MIME-Version: 1.0\r\n\
             Content-Transfer-Encoding: {encoding}\r\n\
             to: {to}\r\n\
             subject: {subject}\r\n\
             \r\n\
             {body}"
        )
    }

    /// The `raw` field the Gmail send endpoint expects.
    pub fn encode_raw(&self) -> String {
        URL_SAFE.encode(self.to_mime().as_bytes())
    }
}

pub struct NotificationMessageService;

impl NotificationMessageService {
    pub fn build_message(event: &Event, sender_name: Option<&str>) -> OutgoingMail {
        let subject = format!(
            "Reminder that event {} will start on {}!",
            event.title,
            event.date.format(TIMESTAMP_FORMAT)
        );
        let body = match sender_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => format!("{}\nFrom {} using Event Planner.", event.description, name),
            None => format!("{}\nSent using Event Planner.", event.description),
        };
        OutgoingMail {
            to: event.emails.clone(),
            subject,
            body,
        }
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(76)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}
