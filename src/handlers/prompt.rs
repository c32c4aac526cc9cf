//! Interactive event form. Blocking: call from a blocking context.

use inquire::{Confirm, InquireError, Text};

use crate::error::{PlannerError, Result};
use crate::service::event_service::EventInput;

pub fn prompt_event_input(existing: Option<&EventInput>, notify_available: bool) -> Result<EventInput> {
    let defaults = existing.cloned().unwrap_or_default();

    let title = Text::new("Title:")
        .with_initial_value(&defaults.title)
        .prompt()
        .map_err(prompt_error)?;
    let description = Text::new("Description:")
        .with_initial_value(&defaults.description)
        .prompt()
        .map_err(prompt_error)?;
    let date = Text::new("Date (YYYY-MM-DD HH:MM):")
        .with_initial_value(&defaults.date)
        .prompt()
        .map_err(prompt_error)?;
    let emails = Text::new("Emails (comma separated):")
        .with_initial_value(&defaults.emails)
        .prompt()
        .map_err(prompt_error)?;

    let notify_at = if notify_available {
        let wants_notify = Confirm::new("Send an email notification?")
            .with_default(defaults.notify_at.is_some())
            .prompt()
            .map_err(prompt_error)?;
        if wants_notify {
            let initial = defaults.notify_at.clone().unwrap_or_default();
            Some(
                Text::new("Notify at (YYYY-MM-DD HH:MM):")
                    .with_initial_value(&initial)
                    .prompt()
                    .map_err(prompt_error)?,
            )
        } else {
            None
        }
    } else {
        println!("To use notifications, please sign in to your Google Account (`login`).");
        None
    };

    Ok(EventInput {
        title,
        description,
        date,
        emails,
        notify_at,
    })
}

pub fn prompt_error(err: InquireError) -> PlannerError {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            PlannerError::Prompt("cancelled".to_string())
        }
        other => PlannerError::Prompt(other.to_string()),
    }
}
