//! Delivery of user-visible notifications.
use std::sync::Mutex;

use console::style;
use log::{info, warn};

use crate::Result;

/// Title used for todo reminders.
pub const REMINDER_TITLE: &str = "Task Reminder";

/// Displays system notifications on behalf of the core.
pub trait Notifier: Send + Sync {
    /// Asks for permission to show notifications. Returns whether it was
    /// granted.
    fn request_permission(&self) -> bool;

    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Prints notifications to the terminal.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn request_permission(&self) -> bool {
        true
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        info!("Notification: {} - {}", title, body);
        println!("{} {}", style(format!("[{}]", title)).yellow().bold(), body);
        Ok(())
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Keeps notifications in memory instead of showing them.
#[derive(Debug)]
pub struct RecordingNotifier {
    granted: bool,
    permission_requests: Mutex<usize>,
    sent: Mutex<Vec<Notification>>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RecordingNotifier {
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            permission_requests: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.lock().map(|n| *n).unwrap_or(0)
    }
}

impl Notifier for RecordingNotifier {
    fn request_permission(&self) -> bool {
        if let Ok(mut requests) = self.permission_requests.lock() {
            *requests += 1;
        }
        self.granted
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        if !self.granted {
            warn!("Notification permission not granted, dropping '{}'", title);
            return Ok(());
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(Notification {
                title: title.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }
}
