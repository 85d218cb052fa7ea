//! Shared types for the notepad application.
//!
//! This module contains the result alias, operation summaries and the
//! command-line subcommand definitions.
use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

use crate::{FontSize, NotepadError};

/// A specialized Result type for notepad operations.
pub type Result<T> = std::result::Result<T, NotepadError>;

/// Summary of an import operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Notes in the imported document, `None` if the key was absent
    pub notes_imported: Option<usize>,
    /// Todos in the imported document, `None` if the key was absent
    pub todos_imported: Option<usize>,
    /// Whether a settings record was merged
    pub settings_merged: bool,
}

/// On/off switch for boolean settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn enabled(self) -> bool {
        matches!(self, Switch::On)
    }
}

/// Available subcommands for the notepad application
#[derive(Subcommand)]
pub enum Commands {
    /// Create, read, edit and search notes
    #[clap(subcommand)]
    Note(NoteCommand),

    /// Manage tasks and their reminders
    #[clap(subcommand)]
    Todo(TodoCommand),

    /// Show or change preferences
    #[clap(subcommand)]
    Settings(SettingsCommand),

    /// Write all notes, tasks and settings to a backup file
    Export {
        /// Directory for the backup file (default uses config setting)
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Print the backup to stdout instead of writing a file
        #[clap(long)]
        stdout: bool,
    },

    /// Load notes, tasks and settings from a backup file
    Import {
        /// Path to the backup file
        file: PathBuf,
    },

    /// Delete all notes and tasks and reset settings
    Clear {
        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Check for due task reminders once
    Remind,

    /// Keep running and send task reminders until interrupted
    Daemon,
}

#[derive(Subcommand)]
pub enum NoteCommand {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: String,

        /// Content of the note
        #[clap(short, long)]
        content: String,

        /// Background color token
        #[clap(long)]
        color: Option<String>,

        /// Image file to attach
        #[clap(short, long)]
        image: Option<PathBuf>,

        /// Require the PIN to open the note
        #[clap(short, long)]
        locked: bool,
    },

    /// List notes, most recent first
    List {
        /// Limit the number of notes shown (0 means no limit)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// View a note by ID
    View {
        /// ID of the note to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: String,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// New background color token
        #[clap(long)]
        color: Option<String>,

        /// Replace the attached image
        #[clap(short, long)]
        image: Option<PathBuf>,

        /// Lock the note
        #[clap(long, conflicts_with = "unlock")]
        lock: bool,

        /// Unlock the note
        #[clap(long)]
        unlock: bool,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Print a note as shareable text
    Share {
        /// ID of the note to share
        id: String,
    },

    /// Search notes by title or content
    Search {
        /// Search query text
        query: String,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TodoCommand {
    /// Add a task
    Add {
        /// What needs doing
        text: String,

        /// Reminder time (RFC 3339, or YYYY-MM-DDTHH:MM in local time)
        #[clap(short, long)]
        at: Option<String>,
    },

    /// List tasks
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit a task
    Edit {
        /// ID of the task
        id: String,

        /// New text
        #[clap(short, long)]
        text: Option<String>,

        /// New reminder time
        #[clap(short, long, conflicts_with = "no_reminder")]
        at: Option<String>,

        /// Remove the reminder time
        #[clap(long)]
        no_reminder: bool,
    },

    /// Mark a task done, or not done again
    Toggle {
        /// ID of the task
        id: String,
    },

    /// Delete a task
    Delete {
        /// ID of the task
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Show current settings
    Show {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Switch dark mode on or off
    DarkMode {
        #[clap(value_enum)]
        state: Switch,
    },

    /// Set the font size
    FontSize {
        #[clap(value_enum)]
        size: FontSize,
    },

    /// Require the PIN before any command runs
    AppLock {
        #[clap(value_enum)]
        state: Switch,
    },

    /// Switch task reminders on or off
    Notifications {
        #[clap(value_enum)]
        state: Switch,
    },

    /// Change the 4-digit PIN
    ChangePin,
}
