//! CLI module for the notepad application
//!
//! This module handles the command-line interface: it renders the
//! collections, prompts for PINs and confirmations, and forwards each
//! command to the [`Notepad`] core.
use std::{
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use console::{style, Term};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::{
    content_preview, image_data_url, parse_timestamp, run_reminder_pass, Commands, Config, Note,
    NoteCommand, NoteDraft, NoteUpdate, Notepad, NotepadError, ReminderScheduler, Result,
    SettingsCommand, Todo, TodoCommand, TodoUpdate, DEFAULT_NOTE_COLOR,
};

const PREVIEW_CHARS: usize = 150;

/// CLI Application handler - processes CLI commands and interfaces with Notepad
pub struct App {
    /// The notepad core, shared with the reminder scheduler
    notepad: Arc<Mutex<Notepad>>,

    /// Application configuration
    config: Config,

    /// PIN supplied on the command line, if any
    pin: Option<String>,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given notepad and config
    pub fn new(
        notepad: Arc<Mutex<Notepad>>,
        config: Config,
        pin: Option<String>,
        verbose: bool,
    ) -> Self {
        Self {
            notepad,
            config,
            pin,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        self.check_app_lock().await?;
        self.notepad.lock().await.request_notification_permission();

        if !matches!(command, Commands::Remind | Commands::Daemon) {
            self.startup_reminders().await;
        }

        match command {
            Commands::Note(command) => self.run_note(command).await?,
            Commands::Todo(command) => self.run_todo(command).await?,
            Commands::Settings(command) => self.run_settings(command).await?,
            Commands::Export { output, stdout } => self.handle_export(output, stdout).await?,
            Commands::Import { file } => self.handle_import(&file).await?,
            Commands::Clear { force } => self.handle_clear(force).await?,
            Commands::Remind => self.handle_remind().await?,
            Commands::Daemon => self.run_daemon().await?,
        }

        Ok(())
    }

    async fn check_app_lock(&self) -> Result<()> {
        let app_lock = self.notepad.lock().await.settings().app_lock;
        if !app_lock {
            return Ok(());
        }

        let pin = self.pin_or_prompt("Enter PIN")?;
        self.notepad.lock().await.unlock(&pin)?;
        debug!("App unlocked");
        Ok(())
    }

    async fn startup_reminders(&self) {
        let mut notepad = self.notepad.lock().await;
        if let Err(e) = run_reminder_pass(&mut notepad) {
            warn!("Reminder check at startup failed: {}", e);
        }
    }

    // ---------------------------------------------------------------------
    // Notes
    // ---------------------------------------------------------------------

    async fn run_note(&self, command: NoteCommand) -> Result<()> {
        match command {
            NoteCommand::Create {
                title,
                content,
                color,
                image,
                locked,
            } => {
                let image = image.as_deref().map(image_data_url).transpose()?;
                let draft = NoteDraft {
                    title,
                    content,
                    color,
                    image,
                    locked,
                };
                let note = self.notepad.lock().await.create_note(draft)?;
                println!("Note created with ID: {}", note.id);
            }

            NoteCommand::List { limit, json } => {
                let (mut notes, now) = {
                    let notepad = self.notepad.lock().await;
                    (notepad.notes().to_vec(), notepad.now())
                };
                if limit > 0 {
                    notes.truncate(limit);
                }
                self.display_notes(&notes, json, now)?;
            }

            NoteCommand::View { id, json } => {
                let pin = self.note_pin(&id).await?;
                let notepad = self.notepad.lock().await;
                let note = notepad.view_note(&id, pin.as_deref())?;
                if json {
                    println!("{}", serde_json::to_string_pretty(note)?);
                } else {
                    display_note_detail(note, notepad.now());
                }
            }

            NoteCommand::Edit {
                id,
                title,
                content,
                color,
                image,
                lock,
                unlock,
            } => {
                let image = image.as_deref().map(image_data_url).transpose()?;
                let locked = match (lock, unlock) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                let update = NoteUpdate {
                    title,
                    content,
                    color,
                    image,
                    locked,
                };

                let pin = self.note_pin(&id).await?;
                self.notepad
                    .lock()
                    .await
                    .update_note(&id, update, pin.as_deref())?;
                println!("Note updated successfully");
            }

            NoteCommand::Delete { id, force } => self.handle_note_delete(id, force).await?,

            NoteCommand::Share { id } => {
                let pin = self.note_pin(&id).await?;
                let text = self.notepad.lock().await.share_note(&id, pin.as_deref())?;
                println!("{}", text);
            }

            NoteCommand::Search { query, json } => {
                let (results, now) = {
                    let notepad = self.notepad.lock().await;
                    let results: Vec<Note> =
                        notepad.search_notes(&query).into_iter().cloned().collect();
                    (results, notepad.now())
                };

                if results.is_empty() {
                    println!("No notes found matching query: \"{}\"", query);
                    return Ok(());
                }
                self.display_notes(&results, json, now)?;
            }
        }

        Ok(())
    }

    async fn handle_note_delete(&self, id: String, force: bool) -> Result<()> {
        let pin = self.note_pin(&id).await?;

        // Authorize first so a wrong PIN is reported before asking to confirm.
        let title = {
            let notepad = self.notepad.lock().await;
            match notepad.view_note(&id, pin.as_deref()) {
                Ok(note) => note.title.clone(),
                Err(NotepadError::NoteNotFound { .. }) => {
                    println!("No note with ID {}; nothing to delete.", id);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        };

        if !force {
            println!("You are about to delete the note '{}' ({}).", title, id);
            if !confirm("Are you sure you want to delete this note?")? {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        self.notepad.lock().await.delete_note(&id, pin.as_deref())?;
        println!("Note deleted");
        Ok(())
    }

    /// PIN to send along with a note operation: only asked for when the
    /// note is locked.
    async fn note_pin(&self, id: &str) -> Result<Option<String>> {
        let locked = {
            let notepad = self.notepad.lock().await;
            notepad.notes().iter().any(|n| n.id == id && n.locked)
        };

        if locked {
            self.pin_or_prompt("This note is locked. Enter PIN").map(Some)
        } else {
            Ok(None)
        }
    }

    /// Display notes in the requested format
    fn display_notes(&self, notes: &[Note], json: bool, now: DateTime<Utc>) -> Result<()> {
        if notes.is_empty() {
            println!("No notes yet. Create one with `notepad note create`.");
            return Ok(());
        }

        if json {
            let redacted: Vec<serde_json::Value> = notes.iter().map(note_summary_json).collect();
            println!("{}", serde_json::to_string_pretty(&redacted)?);
            return Ok(());
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let mut header = format!("ID: {} | {}", note.id, format_relative_date(note.date, now));
            if note.locked {
                header.push_str(" | locked");
            }
            if note.color != DEFAULT_NOTE_COLOR {
                header.push_str(&format!(" | {}", note.color));
            }
            println!("{}", header);
            println!("Title: {}", style(&note.title).bold());

            if note.locked {
                println!("{}", style("Content hidden. Use `note view` with the PIN.").dim());
            } else {
                if note.image.is_some() {
                    println!("{}", style("[image attached]").cyan());
                }
                let preview = content_preview(&note.content, PREVIEW_CHARS);
                if !preview.is_empty() {
                    println!("\n{}", preview);
                }
            }
        }

        if self.verbose {
            println!(
                "\nFound {} note{}",
                notes.len(),
                if notes.len() == 1 { "" } else { "s" }
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Todos
    // ---------------------------------------------------------------------

    async fn run_todo(&self, command: TodoCommand) -> Result<()> {
        match command {
            TodoCommand::Add { text, at } => {
                let time = at.as_deref().map(parse_timestamp).transpose()?;
                let todo = self.notepad.lock().await.create_todo(&text, time)?;
                println!("Task created with ID: {}", todo.id);
            }

            TodoCommand::List { json } => {
                let todos = self.notepad.lock().await.todos().to_vec();
                if json {
                    println!("{}", serde_json::to_string_pretty(&todos)?);
                } else {
                    display_todos(&todos);
                }
            }

            TodoCommand::Edit {
                id,
                text,
                at,
                no_reminder,
            } => {
                let time = if no_reminder {
                    Some(None)
                } else {
                    at.as_deref().map(parse_timestamp).transpose()?.map(Some)
                };
                self.notepad
                    .lock()
                    .await
                    .update_todo(&id, TodoUpdate { text, time })?;
                println!("Task updated successfully");
            }

            TodoCommand::Toggle { id } => {
                let completed = self.notepad.lock().await.toggle_todo_completed(&id)?;
                if completed {
                    println!("Task {} marked as done", id);
                } else {
                    println!("Task {} marked as not done", id);
                }
            }

            TodoCommand::Delete { id, force } => {
                if !force && !confirm("Are you sure you want to delete this task?")? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
                if self.notepad.lock().await.delete_todo(&id)? {
                    println!("Task deleted");
                } else {
                    println!("No task with ID {}; nothing to delete.", id);
                }
            }
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    async fn run_settings(&self, command: SettingsCommand) -> Result<()> {
        match command {
            SettingsCommand::Show { json } => {
                let settings = self.notepad.lock().await.settings().clone();
                if json {
                    let mut value = serde_json::to_value(&settings)?;
                    if let Some(object) = value.as_object_mut() {
                        object.remove("pin");
                    }
                    println!("{}", serde_json::to_string_pretty(&value)?);
                } else {
                    println!("Dark mode:     {}", on_off(settings.dark_mode));
                    println!("Font size:     {}", settings.font_size);
                    println!("App lock:      {}", on_off(settings.app_lock));
                    println!("Notifications: {}", on_off(settings.notifications));
                }
            }

            SettingsCommand::DarkMode { state } => {
                self.notepad.lock().await.set_dark_mode(state.enabled())?;
                println!("Dark mode {}", on_off(state.enabled()));
            }

            SettingsCommand::FontSize { size } => {
                self.notepad.lock().await.set_font_size(size)?;
                println!("Font size set to {}", size);
            }

            SettingsCommand::AppLock { state } => {
                self.notepad.lock().await.set_app_lock(state.enabled())?;
                if state.enabled() {
                    println!("App lock enabled");
                } else {
                    println!("App lock disabled");
                }
            }

            SettingsCommand::Notifications { state } => {
                self.notepad
                    .lock()
                    .await
                    .set_notifications(state.enabled())?;
                println!("Notifications {}", on_off(state.enabled()));
            }

            SettingsCommand::ChangePin => {
                let current = self.pin_or_prompt("Enter current PIN")?;
                let new_pin = prompt_secret("Enter new PIN (4 digits)")?;
                let confirm_pin = prompt_secret("Confirm new PIN")?;
                self.notepad
                    .lock()
                    .await
                    .change_pin(&current, &new_pin, &confirm_pin)?;
                println!("PIN changed successfully");
            }
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Data
    // ---------------------------------------------------------------------

    async fn handle_export(&self, output: Option<PathBuf>, to_stdout: bool) -> Result<()> {
        let notepad = self.notepad.lock().await;
        if to_stdout {
            println!("{}", notepad.export_json()?);
            return Ok(());
        }

        let dir = output.unwrap_or_else(|| self.config.export_dir.clone());
        let path = notepad.export_to_dir(&dir)?;
        println!("Data exported successfully to {}", path.display());
        Ok(())
    }

    async fn handle_import(&self, file: &Path) -> Result<()> {
        let mut notepad = self.notepad.lock().await;
        let summary = notepad.import_file(file)?;
        notepad.request_notification_permission();

        println!("Data imported successfully");
        if self.verbose {
            if let Some(count) = summary.notes_imported {
                println!("  Notes: {}", count);
            }
            if let Some(count) = summary.todos_imported {
                println!("  Tasks: {}", count);
            }
            if summary.settings_merged {
                println!("  Settings merged");
            }
        }
        Ok(())
    }

    async fn handle_clear(&self, force: bool) -> Result<()> {
        if !force {
            if !confirm("Are you sure you want to delete all data? This cannot be undone.")? {
                println!("Nothing was deleted.");
                return Ok(());
            }
            let typed = read_line("Type \"DELETE\" to confirm: ")?;
            if typed != "DELETE" {
                println!("Nothing was deleted.");
                return Ok(());
            }
        }

        self.notepad.lock().await.clear_all_data()?;
        println!("All data cleared");
        Ok(())
    }

    async fn handle_remind(&self) -> Result<()> {
        let mut notepad = self.notepad.lock().await;
        if !notepad.settings().notifications {
            println!("Notifications are off; no reminders checked.");
            return Ok(());
        }

        let fired = run_reminder_pass(&mut notepad)?;
        println!(
            "{} reminder{} sent",
            fired,
            if fired == 1 { "" } else { "s" }
        );
        Ok(())
    }

    async fn run_daemon(&self) -> Result<()> {
        let mut scheduler = ReminderScheduler::new(&self.config);
        scheduler.set_notepad(&self.notepad);
        scheduler.start().await?;

        println!(
            "Watching for task reminders every {}s. Press Ctrl-C to stop.",
            self.config.reminder_interval_secs
        );
        tokio::signal::ctrl_c().await?;
        info!("Interrupt received");

        scheduler.stop().await?;
        let status = scheduler.get_status();
        println!("Stopped after sending {} reminder(s).", status.total_fired);
        Ok(())
    }

    fn pin_or_prompt(&self, prompt: &str) -> Result<String> {
        match &self.pin {
            Some(pin) => Ok(pin.clone()),
            None => prompt_secret(prompt),
        }
    }
}

fn prompt_secret(prompt: &str) -> Result<String> {
    let term = Term::stderr();
    term.write_str(&format!("{}: ", prompt))?;
    Ok(term.read_secure_line()?.trim().to_string())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    stdout().flush()?;

    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = read_line(&format!("{} [y/N]: ", question))?.to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn display_note_detail(note: &Note, now: DateTime<Utc>) {
    println!("{}", style(&note.title).bold());
    let mut meta = format_relative_date(note.date, now);
    if note.locked {
        meta.push_str(" | locked");
    }
    println!("{}", style(meta).dim());
    if let Some(image) = &note.image {
        let kind = image
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("image");
        println!("{}", style(format!("[{} attached]", kind)).cyan());
    }
    println!("\n{}", note.content);
}

fn display_todos(todos: &[Todo]) {
    if todos.is_empty() {
        println!("No tasks yet. Add one with `notepad todo add`.");
        return;
    }

    for todo in todos {
        let check = if todo.completed { "[x]" } else { "[ ]" };
        let text = if todo.completed {
            style(todo.text.as_str()).dim().to_string()
        } else {
            todo.text.clone()
        };
        let mut line = format!("{} {}  ({})", check, text, todo.id);
        if let Some(time) = todo.time {
            line.push_str(&format!("  @ {}", time.format("%Y-%m-%d %H:%M")));
        }
        println!("{}", line);
    }
}

/// JSON shape for list output; locked notes have their content withheld.
fn note_summary_json(note: &Note) -> serde_json::Value {
    let (content, image) = if note.locked {
        (serde_json::Value::Null, serde_json::Value::Null)
    } else {
        (
            serde_json::Value::from(note.content.clone()),
            serde_json::Value::from(note.image.clone()),
        )
    };

    serde_json::json!({
        "id": note.id,
        "title": note.title,
        "content": content,
        "color": note.color,
        "image": image,
        "locked": note.locked,
        "date": note.date.to_rfc3339(),
    })
}

/// "Today", "Yesterday", "N days ago" within a week, else the date.
fn format_relative_date(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - date).num_days() {
        days if days <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days if days < 7 => format!("{} days ago", days),
        _ => date.format("%Y-%m-%d").to_string(),
    }
}
