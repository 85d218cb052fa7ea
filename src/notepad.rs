//! Command layer: every create/update/delete/search over the store.
//!
//! Each mutating operation ends by persisting the collection it touched,
//! so the store and its backend never disagree once a call returns.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::{
    next_id, Clock, FontSize, Note, NoteDraft, NoteUpdate, NotepadError, Notifier, Pin, Result,
    Settings, Store, Todo, TodoUpdate, DEFAULT_NOTE_COLOR,
};

/// The notepad application core.
pub struct Notepad {
    pub(crate) store: Store,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl Notepad {
    pub fn new(store: Store, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    pub fn notes(&self) -> &[Note] {
        self.store.notes()
    }

    pub fn todos(&self) -> &[Todo] {
        self.store.todos()
    }

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Asks the notifier for permission if notifications are switched on.
    pub fn request_notification_permission(&self) -> bool {
        if !self.settings().notifications {
            return false;
        }
        let granted = self.notifier.request_permission();
        if !granted {
            warn!("Notification permission was not granted");
        }
        granted
    }

    // ---------------------------------------------------------------------
    // Notes
    // ---------------------------------------------------------------------

    /// Creates a note and puts it at the front of the list.
    pub fn create_note(&mut self, draft: NoteDraft) -> Result<Note> {
        let title = required(&draft.title, "Please fill in all fields")?;
        let content = required(&draft.content, "Please fill in all fields")?;

        let now = self.clock.now();
        let notes = &self.store.notes;
        let id = next_id(now, |candidate| notes.iter().any(|n| n.id == candidate));

        let note = Note {
            id,
            title,
            content,
            color: normalize_color(draft.color),
            image: draft.image,
            locked: draft.locked,
            date: now,
        };

        self.store.notes.insert(0, note.clone());
        self.store.save_notes()?;
        info!("Note created: {}", note.id);
        Ok(note)
    }

    /// Returns a note, asking for the PIN when it is locked.
    pub fn view_note(&self, id: &str, pin: Option<&str>) -> Result<&Note> {
        let note = self.find_note(id)?;
        self.authorize(note, pin)?;
        Ok(note)
    }

    /// Text to hand to a share target, gated like [`Notepad::view_note`].
    pub fn share_note(&self, id: &str, pin: Option<&str>) -> Result<String> {
        Ok(self.view_note(id, pin)?.share_text())
    }

    /// Merges `update` over the note and refreshes its date.
    pub fn update_note(&mut self, id: &str, update: NoteUpdate, pin: Option<&str>) -> Result<Note> {
        let title = update
            .title
            .as_deref()
            .map(|t| required(t, "Please fill in all fields"))
            .transpose()?;
        let content = update
            .content
            .as_deref()
            .map(|c| required(c, "Please fill in all fields"))
            .transpose()?;

        let index = self.note_index(id)?;
        self.authorize(&self.store.notes[index], pin)?;

        let now = self.clock.now();
        let note = &mut self.store.notes[index];
        if let Some(title) = title {
            note.title = title;
        }
        if let Some(content) = content {
            note.content = content;
        }
        if update.color.is_some() {
            note.color = normalize_color(update.color);
        }
        if let Some(image) = update.image {
            note.image = Some(image);
        }
        if let Some(locked) = update.locked {
            note.locked = locked;
        }
        note.date = now;
        let updated = note.clone();

        self.store.save_notes()?;
        info!("Note updated: {}", id);
        Ok(updated)
    }

    /// Removes a note. Returns `false` when there was nothing to remove.
    pub fn delete_note(&mut self, id: &str, pin: Option<&str>) -> Result<bool> {
        let Some(index) = self.store.notes.iter().position(|n| n.id == id) else {
            debug!("Delete of absent note {} ignored", id);
            return Ok(false);
        };
        self.authorize(&self.store.notes[index], pin)?;

        self.store.notes.remove(index);
        self.store.save_notes()?;
        info!("Note deleted: {}", id);
        Ok(true)
    }

    /// Notes whose title or content contains `query`, ignoring case, in
    /// their stored order.
    pub fn search_notes(&self, query: &str) -> Vec<&Note> {
        self.store
            .notes
            .iter()
            .filter(|note| note.matches(query))
            .collect()
    }

    fn find_note(&self, id: &str) -> Result<&Note> {
        self.store
            .notes
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| NotepadError::NoteNotFound { id: id.to_string() })
    }

    fn note_index(&self, id: &str) -> Result<usize> {
        self.store
            .notes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| NotepadError::NoteNotFound { id: id.to_string() })
    }

    fn authorize(&self, note: &Note, pin: Option<&str>) -> Result<()> {
        if !note.locked {
            return Ok(());
        }
        match pin {
            None => Err(NotepadError::PinRequired {
                id: note.id.clone(),
            }),
            Some(pin) if self.store.settings.pin.matches(pin) => Ok(()),
            Some(_) => {
                warn!("Incorrect PIN for locked note {}", note.id);
                Err(NotepadError::IncorrectPin)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Todos
    // ---------------------------------------------------------------------

    /// Appends a new open todo.
    pub fn create_todo(&mut self, text: &str, time: Option<DateTime<Utc>>) -> Result<Todo> {
        let text = required(text, "Please enter a task")?;

        let now = self.clock.now();
        let todos = &self.store.todos;
        let id = next_id(now, |candidate| todos.iter().any(|t| t.id == candidate));

        let todo = Todo {
            id,
            text,
            time,
            completed: false,
            notified: false,
        };

        self.store.todos.push(todo.clone());
        self.store.save_todos()?;
        info!("Task created: {}", todo.id);
        Ok(todo)
    }

    /// Edits text and reminder time. `completed` and `notified` are kept.
    pub fn update_todo(&mut self, id: &str, update: TodoUpdate) -> Result<Todo> {
        let text = update
            .text
            .as_deref()
            .map(|t| required(t, "Please enter a task"))
            .transpose()?;

        let todo = self.todo_mut(id)?;
        if let Some(text) = text {
            todo.text = text;
        }
        if let Some(time) = update.time {
            todo.time = time;
        }
        let updated = todo.clone();

        self.store.save_todos()?;
        info!("Task updated: {}", id);
        Ok(updated)
    }

    /// Flips `completed` and returns the new value.
    pub fn toggle_todo_completed(&mut self, id: &str) -> Result<bool> {
        let todo = self.todo_mut(id)?;
        todo.completed = !todo.completed;
        let completed = todo.completed;

        self.store.save_todos()?;
        debug!("Task {} completed={}", id, completed);
        Ok(completed)
    }

    /// Removes a todo. Returns `false` when there was nothing to remove.
    pub fn delete_todo(&mut self, id: &str) -> Result<bool> {
        let before = self.store.todos.len();
        self.store.todos.retain(|t| t.id != id);
        if self.store.todos.len() == before {
            debug!("Delete of absent task {} ignored", id);
            return Ok(false);
        }

        self.store.save_todos()?;
        info!("Task deleted: {}", id);
        Ok(true)
    }

    fn todo_mut(&mut self, id: &str) -> Result<&mut Todo> {
        self.store
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| NotepadError::TodoNotFound { id: id.to_string() })
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    /// Checks the app-lock PIN.
    pub fn unlock(&self, pin: &str) -> Result<()> {
        if self.store.settings.pin.matches(pin) {
            Ok(())
        } else {
            warn!("Incorrect PIN on unlock");
            Err(NotepadError::IncorrectPin)
        }
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<()> {
        self.store.settings.dark_mode = enabled;
        self.store.save_settings()
    }

    pub fn set_font_size(&mut self, size: FontSize) -> Result<()> {
        self.store.settings.font_size = size;
        self.store.save_settings()
    }

    pub fn set_app_lock(&mut self, enabled: bool) -> Result<()> {
        self.store.settings.app_lock = enabled;
        self.store.save_settings()?;
        info!("App lock {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Switches reminders on or off. Turning them on asks the notifier for
    /// permission.
    pub fn set_notifications(&mut self, enabled: bool) -> Result<()> {
        self.store.settings.notifications = enabled;
        self.store.save_settings()?;
        if enabled {
            self.request_notification_permission();
        }
        Ok(())
    }

    /// Replaces the PIN after checking the current one and the
    /// confirmation.
    pub fn change_pin(&mut self, current: &str, new_pin: &str, confirm: &str) -> Result<()> {
        self.unlock(current)?;

        let pin: Pin = new_pin.parse()?;
        if new_pin != confirm {
            return Err(NotepadError::validation("PINs do not match"));
        }

        self.store.settings.pin = pin;
        self.store.save_settings()?;
        info!("PIN changed");
        Ok(())
    }

    /// Deletes every note and todo and resets settings to their defaults.
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.store.clear()
    }
}

fn required(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(NotepadError::validation(message))
    } else {
        Ok(trimmed.to_string())
    }
}

fn normalize_color(color: Option<String>) -> String {
    color
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_NOTE_COLOR.to_string())
}
