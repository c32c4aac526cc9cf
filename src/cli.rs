use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::auth;
use crate::clients::google_client::GoogleClient;
use crate::config::Settings;
use crate::credentials::CredentialStore;
use crate::error::{PlannerError, Result};
use crate::handlers::prompt::prompt_event_input;
use crate::runtime;
use crate::service::event_service::{EventInput, EventService};
use crate::store::EventStore;

#[derive(Parser)]
#[command(name = "eventPlanner")]
#[command(about = "Plan events and email reminders to their guests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List events with their index
    List,
    /// Show one event and its notification status
    Show {
        /// Event index (from `list`) or id prefix
        selector: String,
    },
    /// Create an event
    Create {
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Event date, e.g. "2025-03-20 15:00"
        #[arg(long)]
        date: Option<String>,
        /// Comma separated recipient addresses
        #[arg(long, default_value = "")]
        emails: String,
        /// When to email the recipients
        #[arg(long)]
        notify_at: Option<String>,
        /// Fill the form interactively
        #[arg(short, long)]
        interactive: bool,
    },
    /// Replace an event; unspecified fields keep their current value
    Edit {
        selector: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        emails: Option<String>,
        #[arg(long, conflicts_with = "clear_notify")]
        notify_at: Option<String>,
        /// Drop the scheduled notification
        #[arg(long)]
        clear_notify: bool,
        #[arg(short, long)]
        interactive: bool,
    },
    /// Delete an event
    Delete { selector: String },
    /// Sign in to Google to enable notifications
    Login,
    /// Forget the stored Google credential
    Logout,
    /// Show the signed-in Google account
    Account,
    /// Start the notification poller with the interactive shell
    Run {
        /// Only run the poller, stop on Ctrl-C
        #[arg(long)]
        headless: bool,
    },
}

pub async fn cli(cli: Cli, settings: Settings) -> Result<()> {
    let credentials = CredentialStore::new(&settings.credentials_file);
    match cli.command {
        Commands::List => {
            let store = EventStore::load(&settings.events_file)?;
            println!("{}", EventService::render_list(&store));
        }
        Commands::Show { selector } => {
            let store = EventStore::load(&settings.events_file)?;
            let event = store.resolve(&selector)?;
            println!(
                "{}",
                EventService::render_details(event, Local::now().naive_local(), settings.failed_after)
            );
        }
        Commands::Create {
            title,
            description,
            date,
            emails,
            notify_at,
            interactive,
        } => {
            let input = if interactive {
                prompt_event_input(None, credentials.exists())?
            } else {
                let (Some(title), Some(date)) = (title, date) else {
                    return Err(PlannerError::InvalidInput(
                        "--title and --date are required unless --interactive is given".to_string(),
                    ));
                };
                EventInput {
                    title,
                    description,
                    date,
                    emails,
                    notify_at,
                }
            };
            let mut store = EventStore::load(&settings.events_file)?;
            let event = EventService::create(&mut store, input, &credentials)?;
            store.save()?;
            println!("Created [{}] {}", store.len() - 1, event.list_line());
        }
        Commands::Edit {
            selector,
            title,
            description,
            date,
            emails,
            notify_at,
            clear_notify,
            interactive,
        } => {
            let mut store = EventStore::load(&settings.events_file)?;
            let current = store.resolve(&selector)?;
            let id = current.id.clone();
            let mut input = EventInput::from_event(current);
            if interactive {
                input = prompt_event_input(Some(&input), credentials.exists())?;
            } else {
                input.title = title.unwrap_or(input.title);
                input.description = description.unwrap_or(input.description);
                input.date = date.unwrap_or(input.date);
                input.emails = emails.unwrap_or(input.emails);
                if clear_notify {
                    input.notify_at = None;
                } else if notify_at.is_some() {
                    input.notify_at = notify_at;
                }
            }
            let event = EventService::edit(&mut store, &id, input, &credentials)?;
            store.save()?;
            println!("Updated: {}", event.list_line());
        }
        Commands::Delete { selector } => {
            let mut store = EventStore::load(&settings.events_file)?;
            let event = EventService::delete(&mut store, &selector)?;
            store.save()?;
            println!("Deleted: {}", event.list_line());
        }
        Commands::Login => {
            let credential = auth::login(&settings, &GoogleClient::new()).await?;
            info!(scopes = credential.scopes.len(), "signed in");
            println!("Signed in. Notifications are now available.");
        }
        Commands::Logout => {
            if credentials.remove()? {
                println!("Signed out.");
            } else {
                println!("No account was signed in.");
            }
        }
        Commands::Account => {
            let client = GoogleClient::new();
            let credential = credentials.load_valid(&client, Utc::now()).await?;
            let info = client.user_info(&credential.token).await?;
            println!("Email: {}", info.email.as_deref().unwrap_or("(unknown)"));
            println!("Username: {}", info.name.as_deref().unwrap_or("(unknown)"));
        }
        Commands::Run { headless } => runtime::run_planner(settings, headless).await?,
    }
    Ok(())
}
