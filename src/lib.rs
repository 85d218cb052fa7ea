//! Notes and to-do tracker library
//!
//! This library keeps notes, todos and settings in a local key-value store,
//! gates locked notes behind a PIN, fires task reminders on a schedule, and
//! exports/imports everything as a single JSON document.

mod backup;
mod cli;
mod clock;
mod config;
mod errors;
mod helper;
mod note;
mod notepad;
mod notifier;
mod reminder_scheduler;
mod settings;
mod storage;
mod types;

// Re-export key components
pub use backup::*;
pub use cli::*;
pub use clock::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use notepad::*;
pub use notifier::*;
pub use reminder_scheduler::*;
pub use settings::*;
pub use storage::*;
pub use types::*;
