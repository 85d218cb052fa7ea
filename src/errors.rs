//! Error types for the notepad application.
//!
//! This module defines custom error types that categorize the failures
//! that can occur while managing notes, todos and settings.

use std::io;

use thiserror::Error;

/// The main error type for the notepad application.
#[derive(Error, Debug)]
pub enum NotepadError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required field was empty or a value had the wrong shape.
    #[error("{message}")]
    Validation { message: String },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Todo was not found when performing an operation.
    #[error("Task not found: {id}")]
    TodoNotFound { id: String },

    /// The note is locked and no PIN was supplied with the request.
    #[error("Note {id} is locked. Enter PIN")]
    PinRequired { id: String },

    /// The supplied PIN does not match the configured one.
    #[error("Incorrect PIN")]
    IncorrectPin,

    /// Imported or stored JSON could not be understood.
    #[error("Error importing data: {message}")]
    Parse { message: String },

    /// The storage backend rejected a read or write.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Errors raised by the reminder scheduler task.
    #[error("Reminder scheduler error: {message}")]
    SchedulerError { message: String },
}

impl NotepadError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        NotepadError::Validation {
            message: message.into(),
        }
    }

    /// True for the PIN-related failures of the locked-note gate.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            NotepadError::PinRequired { .. } | NotepadError::IncorrectPin
        )
    }
}
