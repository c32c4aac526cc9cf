//! Interactive shell: the foreground front end while the poller runs.

use chrono::Local;
use inquire::{InquireError, Text};

use crate::config::Settings;
use crate::credentials::CredentialStore;
use crate::error::{PlannerError, Result};
use crate::handlers::prompt::prompt_event_input;
use crate::service::event_service::{EventInput, EventService};
use crate::store::SharedStore;

const HELP: &str = "Commands:\n  \
    list              show all events\n  \
    show <n|id>       show event details and notification status\n  \
    new               create an event\n  \
    edit <n|id>       replace an event\n  \
    delete <n|id>     delete an event\n  \
    save              write events to disk\n  \
    help              this text\n  \
    quit              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Show(String),
    New,
    Edit(String),
    Delete(String),
    Save,
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_lowercase();
        let arg = parts.next().map(str::trim).unwrap_or("").to_string();

        let needs_arg = |cmd: fn(String) -> ShellCommand| {
            if arg.is_empty() {
                Err(format!("`{}` needs an event number or id", verb))
            } else {
                Ok(cmd(arg.clone()))
            }
        };

        match verb.as_str() {
            "list" | "ls" => Ok(ShellCommand::List),
            "show" => needs_arg(ShellCommand::Show),
            "new" | "create" => Ok(ShellCommand::New),
            "edit" => needs_arg(ShellCommand::Edit),
            "delete" | "rm" => needs_arg(ShellCommand::Delete),
            "save" => Ok(ShellCommand::Save),
            "help" | "?" | "" => Ok(ShellCommand::Help),
            "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
            other => Err(format!("unknown command `{}`, try `help`", other)),
        }
    }
}

pub async fn run_shell(store: SharedStore, settings: Settings) -> Result<()> {
    let credentials = CredentialStore::new(&settings.credentials_file);
    println!("{}", HELP);
    loop {
        let Some(line) = read_command_line().await? else {
            break;
        };
        match ShellCommand::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => {
                if let Err(err) = execute(command, &store, &settings, &credentials).await {
                    println!("Error: {}", err);
                }
            }
            Err(message) => println!("{}", message),
        }
    }
    Ok(())
}

async fn read_command_line() -> Result<Option<String>> {
    let answer = tokio::task::spawn_blocking(|| Text::new("planner>").prompt())
        .await
        .map_err(|e| PlannerError::Prompt(e.to_string()))?;
    match answer {
        Ok(line) => Ok(Some(line)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(PlannerError::Prompt(err.to_string())),
    }
}

async fn ask_for_event(existing: Option<EventInput>, notify_available: bool) -> Result<EventInput> {
    tokio::task::spawn_blocking(move || prompt_event_input(existing.as_ref(), notify_available))
        .await
        .map_err(|e| PlannerError::Prompt(e.to_string()))?
}

async fn execute(
    command: ShellCommand,
    store: &SharedStore,
    settings: &Settings,
    credentials: &CredentialStore,
) -> Result<()> {
    match command {
        ShellCommand::List => {
            let mut store = store.lock().await;
            store.reload()?;
            println!("{}", EventService::render_list(&store));
        }
        ShellCommand::Show(selector) => {
            let mut store = store.lock().await;
            store.reload()?;
            let event = store.resolve(&selector)?;
            println!(
                "{}",
                EventService::render_details(event, Local::now().naive_local(), settings.failed_after)
            );
        }
        ShellCommand::New => {
            let input = ask_for_event(None, credentials.exists()).await?;
            let mut store = store.lock().await;
            store.reload()?;
            let event = EventService::create(&mut store, input, credentials)?;
            store.save()?;
            println!("Created: {}", event.list_line());
        }
        ShellCommand::Edit(selector) => {
            let (id, current) = {
                let mut store = store.lock().await;
                store.reload()?;
                let event = store.resolve(&selector)?;
                (event.id.clone(), EventInput::from_event(event))
            };
            let input = ask_for_event(Some(current), credentials.exists()).await?;
            let mut store = store.lock().await;
            store.reload()?;
            let event = EventService::edit(&mut store, &id, input, credentials)?;
            store.save()?;
            println!("Updated: {}", event.list_line());
        }
        ShellCommand::Delete(selector) => {
            let mut store = store.lock().await;
            store.reload()?;
            let event = EventService::delete(&mut store, &selector)?;
            store.save()?;
            println!("Deleted: {}", event.list_line());
        }
        ShellCommand::Save => {
            let mut store = store.lock().await;
            store.reload()?;
            store.save()?;
            println!("Saved {} events to {}", store.len(), store.path().display());
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => {}
    }
    Ok(())
}
