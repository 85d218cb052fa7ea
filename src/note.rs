//! Core data structures for the notepad application.
//!
//! This module contains the two record types held by the store, [`Note`]
//! and [`Todo`], together with the inputs used to create and edit them.
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::parse_timestamp;

/// Color token used when a note has no background color.
pub const DEFAULT_NOTE_COLOR: &str = "transparent";

fn default_color() -> String {
    DEFAULT_NOTE_COLOR.to_string()
}

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique, time-based identifier
    pub id: String,
    /// Note title
    pub title: String,
    /// Note body
    pub content: String,
    /// Background color token
    #[serde(default = "default_color")]
    pub color: String,
    /// Attached image as a data URL
    #[serde(default)]
    pub image: Option<String>,
    /// Whether any access requires the PIN
    #[serde(default)]
    pub locked: bool,
    /// Last save time
    pub date: DateTime<Utc>,
}

impl Note {
    /// Text handed to the share target: title, blank line, content.
    pub fn share_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }

    /// Case-insensitive substring match against title or content.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.content.to_lowercase().contains(&query)
    }
}

/// Input for creating a note.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    /// `None` falls back to [`DEFAULT_NOTE_COLOR`]
    pub color: Option<String>,
    pub image: Option<String>,
    pub locked: bool,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Fields to merge over an existing note. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
    pub locked: Option<bool>,
}

/// A task with an optional reminder time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredTodo")]
pub struct Todo {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    pub completed: bool,
    /// Set once by the reminder scheduler, never cleared.
    pub notified: bool,
}

impl Todo {
    /// Whether a reminder should fire for this todo at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.time {
            Some(time) => !self.completed && !self.notified && now >= time,
            None => false,
        }
    }
}

/// Fields to merge over an existing todo.
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub text: Option<String>,
    /// `Some(None)` clears the reminder, `None` keeps it
    pub time: Option<Option<DateTime<Utc>>>,
}

// Stored reminder times may be empty, naive or unreadable. An unreadable
// time drops only the reminder, never the todo.
#[derive(Deserialize)]
struct StoredTodo {
    id: String,
    text: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    notified: bool,
}

impl From<StoredTodo> for Todo {
    fn from(stored: StoredTodo) -> Self {
        let time = match stored.time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => match parse_timestamp(value) {
                Ok(time) => Some(time),
                Err(e) => {
                    warn!("Dropping reminder time of task {}: {}", stored.id, e);
                    None
                }
            },
        };

        Self {
            id: stored.id,
            text: stored.text,
            time,
            completed: stored.completed,
            notified: stored.notified,
        }
    }
}
