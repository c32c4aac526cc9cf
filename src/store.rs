//! Owned, ordered event list backed by a JSON file.
//!
//! The store is shared between the foreground front end and the background
//! poller as a [`SharedStore`]. While the planner runs, the file stays the
//! source of truth: holders call [`EventStore::reload`] before acting and save
//! right after every change, so one-shot commands run from another terminal
//! are picked up instead of overwritten. Users address events by position;
//! the poller addresses them by id.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use crate::error::{PlannerError, Result};
use crate::models::event::{Event, new_event_id};

pub type SharedStore = Arc<Mutex<EventStore>>;

#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
    events: Vec<Event>,
    ids_assigned: bool,
}

impl EventStore {
    /// An empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            events: Vec::new(),
            ids_assigned: false,
        }
    }

    /// Load all events from `path`. A missing or empty file yields an empty
    /// store; any malformed record fails the whole load.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::new(path));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| PlannerError::Store(format!("cannot read {}: {}", path.display(), e)))?;
        if content.trim().is_empty() {
            return Ok(Self::new(path));
        }
        let mut events: Vec<Event> = serde_json::from_str(&content).map_err(|e| {
            PlannerError::Store(format!("malformed events file {}: {}", path.display(), e))
        })?;
        let mut ids_assigned = false;
        for event in events.iter_mut().filter(|event| event.id.is_empty()) {
            event.id = new_event_id();
            ids_assigned = true;
        }
        Ok(Self {
            path,
            events,
            ids_assigned,
        })
    }

    /// Replace the in-memory list with the current file contents.
    ///
    /// Ids handed out to records that had none are written back at once so
    /// the next reload sees the same ids.
    pub fn reload(&mut self) -> Result<()> {
        let fresh = Self::load(&self.path)?;
        self.events = fresh.events;
        if fresh.ids_assigned {
            self.save()?;
        }
        Ok(())
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.events)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the whole list, replacing the previous file atomically.
    pub fn save(&self) -> Result<()> {
        let json = self.to_json()?;
        write_atomic(&self.path, &json)
            .map_err(|e| PlannerError::Store(format!("cannot write {}: {}", self.path.display(), e)))
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.events.iter().position(|event| event.id == id)
    }

    /// Resolve a user-facing selector: a 0-based list index or a unique id prefix.
    pub fn resolve(&self, selector: &str) -> Result<&Event> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(PlannerError::EventNotFound("empty selector".to_string()));
        }
        if let Ok(index) = selector.parse::<usize>() {
            return self
                .events
                .get(index)
                .ok_or_else(|| PlannerError::EventNotFound(format!("no event at index {}", index)));
        }
        let mut matches = self.events.iter().filter(|event| event.id.starts_with(selector));
        match (matches.next(), matches.next()) {
            (Some(event), None) => Ok(event),
            (Some(_), Some(_)) => Err(PlannerError::EventNotFound(format!(
                "id prefix {} is ambiguous",
                selector
            ))),
            (None, _) => Err(PlannerError::EventNotFound(format!("no event with id {}", selector))),
        }
    }

    pub fn add(&mut self, event: Event) -> String {
        let id = event.id.clone();
        self.events.push(event);
        id
    }

    /// Replace the event with `id` wholesale. The id survives, `sent` is reset.
    pub fn replace(&mut self, id: &str, mut event: Event) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| PlannerError::EventNotFound(id.to_string()))?;
        event.id = id.to_string();
        event.sent = false;
        self.events[index] = event;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Event> {
        let index = self
            .position(id)
            .ok_or_else(|| PlannerError::EventNotFound(id.to_string()))?;
        Ok(self.events.remove(index))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Event> {
        if index >= self.events.len() {
            return Err(PlannerError::EventNotFound(format!("no event at index {}", index)));
        }
        Ok(self.events.remove(index))
    }

    /// Snapshot of every event whose notification should be attempted at `now`.
    pub fn due_notifications(&self, now: NaiveDateTime) -> Vec<Event> {
        self.events
            .iter()
            .filter(|event| event.is_due(now))
            .cloned()
            .collect()
    }

    /// Flag `delivered` as sent, but only while the stored event is still
    /// exactly the version that was mailed. Returns false when it was
    /// removed or edited in the meantime.
    pub fn mark_sent(&mut self, delivered: &Event) -> bool {
        match self.events.iter_mut().find(|event| event.id == delivered.id) {
            Some(event) if *event == *delivered => {
                event.sent = true;
                true
            }
            _ => false,
        }
    }
}

fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("events"),
        std::process::id()
    );
    let tmp_path = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(&tmp_name),
        _ => PathBuf::from(&tmp_name),
    };

    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
